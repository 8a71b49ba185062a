use super::{transition, Action, Command, DialogueState, Event};
use crate::domain::{ContractAddress, UserId};
use crate::engine::format_large_number;
use crate::orchestration::{ServiceError, TradingService};
use crate::store::{StoreError, UserLocks};
use dashmap::DashMap;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// One inline button: what the user sees and what comes back when pressed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Button {
    pub label: String,
    pub data: String,
}

impl Button {
    fn new(label: impl Into<String>, action: Action) -> Self {
        Self {
            label: label.into(),
            data: action.to_string(),
        }
    }
}

/// Screen returned to the chat front-end.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reply {
    pub text: String,
    pub keyboard: Vec<Vec<Button>>,
}

impl Reply {
    fn new(text: impl Into<String>, keyboard: Vec<Vec<Button>>) -> Self {
        Self {
            text: text.into(),
            keyboard,
        }
    }
}

/// Drives the dialogue: looks up the user's state, runs the transition table
/// and executes the resulting command.
///
/// Events for one user are handled one at a time, so a state is consumed by
/// exactly one command.
#[derive(Debug)]
pub struct ChatController {
    service: Arc<TradingService>,
    sessions: DashMap<UserId, DialogueState>,
    locks: UserLocks,
}

impl ChatController {
    pub fn new(service: Arc<TradingService>) -> Self {
        Self {
            service,
            sessions: DashMap::new(),
            locks: UserLocks::new(),
        }
    }

    pub fn service(&self) -> &Arc<TradingService> {
        &self.service
    }

    pub fn state(&self, user: UserId) -> DialogueState {
        self.sessions
            .get(&user)
            .map(|s| s.clone())
            .unwrap_or_default()
    }

    pub async fn start(&self, user: UserId) -> Result<Reply, StoreError> {
        self.handle(user, Event::Start).await
    }

    pub async fn press(&self, user: UserId, action: Action) -> Result<Reply, StoreError> {
        self.handle(user, Event::Action(action)).await
    }

    pub async fn message(&self, user: UserId, text: &str) -> Result<Reply, StoreError> {
        self.handle(user, Event::Text(text.to_string())).await
    }

    async fn handle(&self, user: UserId, event: Event) -> Result<Reply, StoreError> {
        let _guard = self.locks.lock(user).await;
        let step = transition(&self.state(user), event);
        debug!("Dialogue user={} command={:?}", user, step.command);

        match self.execute(user, step.command).await {
            Ok((reply, true)) => {
                self.set_state(user, step.on_success);
                Ok(reply)
            }
            Ok((reply, false)) => {
                self.set_state(user, step.on_failure);
                Ok(reply)
            }
            Err(e) => {
                warn!("Dialogue failed for user={}: {}", user, e);
                self.set_state(user, DialogueState::Idle);
                Err(e)
            }
        }
    }

    fn set_state(&self, user: UserId, state: DialogueState) {
        if state == DialogueState::Idle {
            self.sessions.remove(&user);
        } else {
            self.sessions.insert(user, state);
        }
    }

    /// Run one command; the flag says whether the success state applies.
    async fn execute(&self, user: UserId, command: Command) -> Result<(Reply, bool), StoreError> {
        let reply = match command {
            Command::ShowMenu => {
                let text = self.service.menu_header(user).await?;
                Reply::new(text, menu_keyboard())
            }
            Command::ShowBalance { refresh } => {
                let text = self.service.balance_report(user, refresh).await?;
                Reply::new(text, balance_keyboard())
            }
            Command::ShowHistory => {
                let text = self.service.history(user).await?;
                Reply::new(text, back_to_menu_keyboard())
            }
            Command::PromptDeposit => Reply::new(
                "Please enter the amount of SOL to add:",
                back_to_menu_keyboard(),
            ),
            Command::PromptBuyAddress => Reply::new(
                "Please enter the contract address of the token you want to buy:",
                back_to_menu_keyboard(),
            ),
            Command::RejectAddress(e) => {
                let text = format!("Invalid contract address ({}). Please try again.", e);
                return Ok((Reply::new(text, result_keyboard()), false));
            }
            Command::LookupBuyAddress(contract) => {
                let quote = self.service.lookup_token(&contract).await;
                let Some(market_cap) = quote.market_cap.filter(|_| quote.price.is_some()) else {
                    return Ok((
                        Reply::new(
                            "Unable to fetch token information. Please try again.",
                            result_keyboard(),
                        ),
                        false,
                    ));
                };
                let name = quote.name.unwrap_or_else(|| contract.to_string());
                let text = format!(
                    "Token: {}\nMarket Cap: ${}\n\nPlease enter the amount of SOL you want to spend:",
                    name,
                    format_large_number(market_cap)
                );
                Reply::new(text, back_to_menu_keyboard())
            }
            Command::ListSellable => {
                let positions = self.service.sellable_positions(user).await?;
                if positions.is_empty() {
                    Reply::new("You have no tokens to sell.", back_to_menu_keyboard())
                } else {
                    let mut keyboard: Vec<Vec<Button>> = positions
                        .into_iter()
                        .map(|(contract, label)| vec![Button::new(label, Action::SelectSell(contract))])
                        .collect();
                    keyboard.extend(back_to_menu_keyboard());
                    Reply::new("Select a token to sell:", keyboard)
                }
            }
            Command::PromptSellAmount(contract) => {
                match self.service.sell_prompt(user, &contract).await? {
                    Some(text) => Reply::new(text, back_to_menu_keyboard()),
                    None => {
                        return Ok((unable_to_sell(&contract), false));
                    }
                }
            }
            Command::Deposit(amount) => {
                let outcome = self.service.deposit(user, &amount).await;
                return outcome_reply(outcome);
            }
            Command::Buy { contract, amount } => {
                let outcome = self.service.buy(user, &contract, &amount).await;
                return outcome_reply(outcome);
            }
            Command::Sell { contract, amount } => {
                let outcome = self.service.sell(user, &contract, &amount).await;
                return outcome_reply(outcome);
            }
            Command::Unrecognized => Reply::new(
                "Please select an option from the menu.",
                result_keyboard(),
            ),
        };
        Ok((reply, true))
    }
}

/// Trade rejections are shown to the user; storage failures propagate.
fn outcome_reply<T: std::fmt::Display>(
    outcome: Result<T, ServiceError>,
) -> Result<(Reply, bool), StoreError> {
    match outcome {
        Ok(summary) => Ok((Reply::new(summary.to_string(), result_keyboard()), true)),
        Err(ServiceError::Trade(e)) => Ok((Reply::new(e.to_string(), result_keyboard()), false)),
        Err(ServiceError::Storage(e)) => Err(e),
    }
}

fn unable_to_sell(contract: &ContractAddress) -> Reply {
    Reply::new(
        format!(
            "Unable to fetch data for token with contract address: {}. Try again later.",
            contract
        ),
        back_to_menu_keyboard(),
    )
}

fn menu_keyboard() -> Vec<Vec<Button>> {
    vec![
        vec![
            Button::new("➕ Add SOL", Action::AddFunds),
            Button::new("💰 Show Balance", Action::ShowBalance),
        ],
        vec![
            Button::new("🛒 Buy Token", Action::BuyToken),
            Button::new("📉 Sell Token", Action::SellToken),
        ],
        vec![Button::new("📜 History", Action::ShowHistory)],
    ]
}

fn balance_keyboard() -> Vec<Vec<Button>> {
    vec![
        vec![Button::new("🔄 Refresh", Action::RefreshBalance)],
        vec![Button::new("🔙 Back to Menu", Action::BackToMenu)],
    ]
}

fn back_to_menu_keyboard() -> Vec<Vec<Button>> {
    vec![vec![Button::new("🔙 Back to Menu", Action::BackToMenu)]]
}

fn result_keyboard() -> Vec<Vec<Button>> {
    vec![vec![
        Button::new("💰 Back to Balance", Action::BackToBalance),
        Button::new("🔙 Back to Menu", Action::BackToMenu),
    ]]
}
