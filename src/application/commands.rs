//! Parsing of chat commands and inline-button callback data.

use super::support::ACCEPT_PREFIX;
use crate::domain::ids::{ChatId, ProductId};
use std::convert::Infallible;
use std::str::FromStr;

pub const ADD_TO_CART_PREFIX: &str = "add_to_cart_";
pub const CHECKOUT: &str = "checkout";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start,
    Help,
    Products,
    Cart,
    Pay,
    PayPal,
    Support,
    EndSupport,
    // admin
    AdminHelp,
    AddProduct(String),
    EditProduct(String),
    DeleteProduct(String),
    Dashboard,
    ViewOrders,
    ViewCustomers,
    SupportRequests,
    EndSession(String),
    Git(Vec<String>),
    Restart,
    Unknown(String),
}

impl Command {
    pub fn requires_admin(&self) -> bool {
        matches!(
            self,
            Self::AdminHelp
                | Self::AddProduct(_)
                | Self::EditProduct(_)
                | Self::DeleteProduct(_)
                | Self::Dashboard
                | Self::ViewOrders
                | Self::ViewCustomers
                | Self::SupportRequests
                | Self::EndSession(_)
                | Self::Git(_)
                | Self::Restart
        )
    }

    /// Parses `/name[@bot] args...`. Returns `None` for text that is not a
    /// command.
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        let body = text.strip_prefix('/')?;
        let (head, args) = match body.split_once(char::is_whitespace) {
            Some((head, args)) => (head, args.trim()),
            None => (body, ""),
        };
        let name = head.split('@').next().unwrap_or(head);

        let command = match name {
            "start" => Self::Start,
            "help" => Self::Help,
            "products" | "view_products" => Self::Products,
            "cart" => Self::Cart,
            "pay" => Self::Pay,
            "paypal" => Self::PayPal,
            "support" => Self::Support,
            "end_support" => Self::EndSupport,
            "admin_help" | "help_admin" => Self::AdminHelp,
            "add_product" => Self::AddProduct(args.to_string()),
            "edit_product" => Self::EditProduct(args.to_string()),
            "delete_product" => Self::DeleteProduct(args.to_string()),
            "dashboard" => Self::Dashboard,
            "view_orders" => Self::ViewOrders,
            "view_customers" => Self::ViewCustomers,
            "support_requests" => Self::SupportRequests,
            "end_session" => Self::EndSession(args.to_string()),
            "git" => Self::Git(args.split_whitespace().map(str::to_string).collect()),
            "restart" => Self::Restart,
            other => Self::Unknown(other.to_string()),
        };
        Some(command)
    }
}

/// What an inline button asks for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    AddToCart(ProductId),
    Checkout,
    SupportAccept(ChatId),
    Unknown(String),
}

impl FromStr for CallbackAction {
    type Err = Infallible;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let data = data.trim();
        if data == CHECKOUT {
            return Ok(Self::Checkout);
        }
        if let Some(id) = data.strip_prefix(ADD_TO_CART_PREFIX)
            && let Ok(id) = id.parse()
        {
            return Ok(Self::AddToCart(id));
        }
        if let Some(id) = data.strip_prefix(ACCEPT_PREFIX)
            && let Ok(id) = id.parse()
        {
            return Ok(Self::SupportAccept(id));
        }
        Ok(Self::Unknown(data.to_string()))
    }
}
