//! Conversational state machine.
//!
//! [`transition`] is a pure table from `(state, event)` to the command to run
//! and the states to enter when that command succeeds or fails. The
//! [`controller`] executes commands against the trading service and owns the
//! per-user sessions.

pub mod controller;

pub use controller::{Button, ChatController, Reply};

use crate::domain::{AddressParseError, ContractAddress};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const SELL_PREFIX: &str = "sell:";

/// Where a user is in the conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DialogueState {
    #[default]
    Idle,
    AwaitingDeposit,
    AwaitingBuyAddress,
    AwaitingBuyAmount {
        contract: ContractAddress,
    },
    AwaitingSellAmount {
        contract: ContractAddress,
    },
}

/// Button presses, identified by their callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    AddFunds,
    ShowBalance,
    RefreshBalance,
    BuyToken,
    SellToken,
    SelectSell(ContractAddress),
    ShowHistory,
    BackToMenu,
    BackToBalance,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ActionParseError {
    #[error("unknown action: {0}")]
    Unknown(String),
    #[error("invalid contract address in action: {0}")]
    Address(#[from] AddressParseError),
}

impl FromStr for Action {
    type Err = ActionParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if let Some(address) = s.strip_prefix(SELL_PREFIX) {
            return Ok(Action::SelectSell(address.parse()?));
        }
        match s {
            "add_funds" => Ok(Action::AddFunds),
            "show_balance" => Ok(Action::ShowBalance),
            "refresh_balance" => Ok(Action::RefreshBalance),
            "buy_token" => Ok(Action::BuyToken),
            "sell_token" => Ok(Action::SellToken),
            "show_history" => Ok(Action::ShowHistory),
            "back_to_menu" => Ok(Action::BackToMenu),
            "back_to_balance" => Ok(Action::BackToBalance),
            other => Err(ActionParseError::Unknown(other.to_string())),
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Action::AddFunds => f.write_str("add_funds"),
            Action::ShowBalance => f.write_str("show_balance"),
            Action::RefreshBalance => f.write_str("refresh_balance"),
            Action::BuyToken => f.write_str("buy_token"),
            Action::SellToken => f.write_str("sell_token"),
            Action::SelectSell(contract) => write!(f, "{}{}", SELL_PREFIX, contract),
            Action::ShowHistory => f.write_str("show_history"),
            Action::BackToMenu => f.write_str("back_to_menu"),
            Action::BackToBalance => f.write_str("back_to_balance"),
        }
    }
}

/// Input arriving from the chat front-end.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    Start,
    Action(Action),
    Text(String),
}

/// Work the controller performs for one event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    ShowMenu,
    ShowBalance { refresh: bool },
    ShowHistory,
    PromptDeposit,
    PromptBuyAddress,
    RejectAddress(AddressParseError),
    LookupBuyAddress(ContractAddress),
    ListSellable,
    PromptSellAmount(ContractAddress),
    Deposit(String),
    Buy { contract: ContractAddress, amount: String },
    Sell { contract: ContractAddress, amount: String },
    Unrecognized,
}

/// Outcome of [`transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub command: Command,
    pub on_success: DialogueState,
    pub on_failure: DialogueState,
}

impl Step {
    fn to(command: Command, next: DialogueState) -> Self {
        Self {
            command,
            on_success: next.clone(),
            on_failure: next,
        }
    }

    fn branch(command: Command, on_success: DialogueState, on_failure: DialogueState) -> Self {
        Self {
            command,
            on_success,
            on_failure,
        }
    }
}

/// The dialogue transition table.
///
/// Button presses are honored from any state and abandon whatever input was
/// pending. Free text is interpreted by the current state. Every trade
/// attempt ends back in `Idle`, successful or not.
pub fn transition(state: &DialogueState, event: Event) -> Step {
    use DialogueState::*;

    match event {
        Event::Start => Step::to(Command::ShowMenu, Idle),
        Event::Action(action) => match action {
            Action::AddFunds => Step::to(Command::PromptDeposit, AwaitingDeposit),
            Action::BuyToken => Step::to(Command::PromptBuyAddress, AwaitingBuyAddress),
            Action::SellToken => Step::to(Command::ListSellable, Idle),
            Action::SelectSell(contract) => Step::branch(
                Command::PromptSellAmount(contract.clone()),
                AwaitingSellAmount { contract },
                Idle,
            ),
            Action::ShowBalance | Action::BackToBalance => {
                Step::to(Command::ShowBalance { refresh: false }, Idle)
            }
            Action::RefreshBalance => Step::to(Command::ShowBalance { refresh: true }, Idle),
            Action::ShowHistory => Step::to(Command::ShowHistory, Idle),
            Action::BackToMenu => Step::to(Command::ShowMenu, Idle),
        },
        Event::Text(text) => match state {
            Idle => Step::to(Command::Unrecognized, Idle),
            AwaitingDeposit => Step::to(Command::Deposit(text), Idle),
            AwaitingBuyAddress => match text.parse::<ContractAddress>() {
                Ok(contract) => Step::branch(
                    Command::LookupBuyAddress(contract.clone()),
                    AwaitingBuyAmount { contract },
                    AwaitingBuyAddress,
                ),
                Err(e) => Step::to(Command::RejectAddress(e), AwaitingBuyAddress),
            },
            AwaitingBuyAmount { contract } => Step::to(
                Command::Buy {
                    contract: contract.clone(),
                    amount: text,
                },
                Idle,
            ),
            AwaitingSellAmount { contract } => Step::to(
                Command::Sell {
                    contract: contract.clone(),
                    amount: text,
                },
                Idle,
            ),
        },
    }
}
