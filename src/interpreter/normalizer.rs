use serde_json::Value;

use super::command::{AnalyticsMetric, Command, LineItem};
use super::parsers::parse_number;
use crate::core::shared::models::{AnalyticsPeriod, PaymentStatus};

pub const FALLBACK_ASK: &str = "Tell me what happened.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Action {
    RecordSale,
    RecordExpense,
    AddStock,
    RemoveStock,
    CreateProduct,
    Analytics,
    SendEmail,
    CreateInvoice,
    CreateReceipt,
    Unknown,
}

impl From<&str> for Action {
    fn from(s: &str) -> Self {
        let key = s.trim().to_lowercase().replace(|c: char| c == '-' || c == ' ', "_");
        match key.as_str() {
            "record_sale" | "sale" | "sell" | "sold" => Self::RecordSale,
            "record_expense" | "expense" | "spend" | "spent" => Self::RecordExpense,
            "add_stock" | "restock" | "stock_in" | "purchase" | "buy" | "bought" => Self::AddStock,
            "remove_stock" | "stock_out" | "remove" | "removal" | "write_off" => Self::RemoveStock,
            "create_product" | "new_product" | "add_product" | "product" => Self::CreateProduct,
            "analytics" | "report" | "query" | "profit" | "revenue" | "expenses"
            | "top_products" => Self::Analytics,
            "send_email" | "email" | "mail" => Self::SendEmail,
            "create_invoice" | "invoice" | "send_invoice" => Self::CreateInvoice,
            "create_receipt" | "receipt" | "send_receipt" => Self::CreateReceipt,
            _ => Self::Unknown,
        }
    }
}

fn text(raw: &Value, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|k| {
        raw.get(*k)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    })
}

fn number(raw: &Value, keys: &[&str]) -> Option<f64> {
    keys.iter().find_map(|k| match raw.get(*k)? {
        Value::Number(n) => n.as_f64().filter(|f| f.is_finite()),
        Value::String(s) => parse_number(s.trim()),
        _ => None,
    })
}

fn flag(raw: &Value, keys: &[&str]) -> Option<bool> {
    keys.iter().find_map(|k| match raw.get(*k)? {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" => Some(false),
            _ => None,
        },
        _ => None,
    })
}

fn line_items(raw: &Value) -> Vec<LineItem> {
    raw.get("items")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| {
                    Some(LineItem {
                        name: text(item, &["name", "product_name", "product", "description"])?,
                        quantity: number(item, &["quantity", "qty"]).unwrap_or(1.0),
                        unit_price: number(item, &["unit_price", "price", "amount"]).unwrap_or(0.0),
                    })
                })
                .collect()
        })
        .unwrap_or_default()
}

/// Coerces one loosely-shaped action object into a [`Command`].
pub fn normalize(raw: &Value) -> Command {
    let action_name = text(raw, &["action", "type", "intent"]).unwrap_or_default();
    let action = Action::from(action_name.as_str());

    match action {
        Action::RecordSale => Command::RecordSale {
            product_name: text(raw, &["product_name", "product", "name", "item"]),
            quantity: number(raw, &["quantity", "qty"]),
            unit_price: number(raw, &["unit_price", "price"]).unwrap_or(0.0),
            payment_status: text(raw, &["payment_status", "status"])
                .map(|s| PaymentStatus::from_loose(&s))
                .unwrap_or_default(),
        },
        Action::RecordExpense => Command::RecordExpense {
            expense_name: text(raw, &["expense_name", "name", "description", "item"]),
            amount: number(raw, &["amount", "cost", "total"]),
            category: text(raw, &["category"])
                .map(|c| c.to_lowercase())
                .unwrap_or_else(|| "general".to_string()),
        },
        Action::AddStock | Action::RemoveStock => {
            let product_name = text(raw, &["product_name", "product", "name", "item"]);
            let quantity = number(raw, &["quantity", "qty"]);
            if action == Action::AddStock {
                Command::AddStock {
                    product_name,
                    quantity,
                }
            } else {
                Command::RemoveStock {
                    product_name,
                    quantity,
                }
            }
        }
        Action::CreateProduct => Command::CreateProduct {
            product_name: text(raw, &["product_name", "product", "name"]),
            reorder_threshold: number(raw, &["reorder_threshold", "threshold", "reorder_at"]),
        },
        Action::Analytics => Command::Analytics {
            metric: text(raw, &["metric"])
                .map(|m| AnalyticsMetric::from_loose(&m))
                .unwrap_or_else(|| AnalyticsMetric::from_loose(&action_name)),
            period: text(raw, &["period", "range"])
                .map(|p| AnalyticsPeriod::from_loose(&p))
                .unwrap_or_default(),
            payment_split: flag(raw, &["payment_split", "split"]),
        },
        Action::SendEmail => Command::SendEmail {
            to: text(raw, &["to", "email", "recipient"]),
            subject: text(raw, &["subject", "title"]),
            message: text(raw, &["message", "body", "text"]),
        },
        Action::CreateInvoice | Action::CreateReceipt => {
            let to = text(raw, &["to", "email", "recipient"]);
            let items = line_items(raw);
            let note = text(raw, &["note", "notes"]);
            let send_email = flag(raw, &["send_email"]).unwrap_or(true);
            if action == Action::CreateInvoice {
                Command::CreateInvoice {
                    to,
                    items,
                    note,
                    send_email,
                }
            } else {
                Command::CreateReceipt {
                    to,
                    items,
                    note,
                    send_email,
                }
            }
        }
        Action::Unknown => Command::unknown(
            text(raw, &["ask", "question"]).unwrap_or_else(|| FALLBACK_ASK.to_string()),
        ),
    }
}

pub fn normalize_actions(raw: &[Value]) -> Vec<Command> {
    raw.iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_canonical_commands_are_fixed_points() {
        let commands = vec![
            Command::RecordSale {
                product_name: Some("Rice".to_string()),
                quantity: Some(2.0),
                unit_price: 4.0,
                payment_status: PaymentStatus::Unpaid,
            },
            Command::RecordSale {
                product_name: None,
                quantity: None,
                unit_price: 0.0,
                payment_status: PaymentStatus::Paid,
            },
            Command::RecordExpense {
                expense_name: Some("transport".to_string()),
                amount: Some(20.0),
                category: "general".to_string(),
            },
            Command::AddStock {
                product_name: Some("beans".to_string()),
                quantity: Some(10.0),
            },
            Command::RemoveStock {
                product_name: Some("beans".to_string()),
                quantity: Some(1.5),
            },
            Command::CreateProduct {
                product_name: Some("Palm Oil".to_string()),
                reorder_threshold: Some(3.0),
            },
            Command::Analytics {
                metric: AnalyticsMetric::TopProducts,
                period: AnalyticsPeriod::Month,
                payment_split: Some(true),
            },
            Command::Analytics {
                metric: AnalyticsMetric::Expenses,
                period: AnalyticsPeriod::Today,
                payment_split: None,
            },
            Command::SendEmail {
                to: Some("a@b.co".to_string()),
                subject: None,
                message: Some("hi".to_string()),
            },
            Command::CreateInvoice {
                to: Some("a@b.co".to_string()),
                items: vec![LineItem {
                    name: "rice".to_string(),
                    quantity: 3.0,
                    unit_price: 4.0,
                }],
                note: Some("thanks".to_string()),
                send_email: false,
            },
            Command::CreateReceipt {
                to: Some("a@b.co".to_string()),
                items: vec![],
                note: None,
                send_email: true,
            },
            Command::unknown("what?"),
        ];

        for cmd in commands {
            let value = serde_json::to_value(&cmd).unwrap();
            assert_eq!(normalize(&value), cmd, "round trip of {value}");
        }
    }

    #[test]
    fn test_aliases_and_numeric_strings() {
        let cmd = normalize(&json!({
            "action": "sale",
            "product": "  Rice ",
            "qty": "2",
            "price": "$1,250.50",
            "payment_status": "on credit"
        }));
        assert_eq!(
            cmd,
            Command::RecordSale {
                product_name: Some("Rice".to_string()),
                quantity: Some(2.0),
                unit_price: 1250.5,
                payment_status: PaymentStatus::Unpaid,
            }
        );
    }

    #[test]
    fn test_blank_and_non_finite_values_become_absent() {
        let cmd = normalize(&json!({
            "action": "Record-Expense",
            "expense_name": "   ",
            "amount": "NaN",
            "category": "  Inventory "
        }));
        assert_eq!(
            cmd,
            Command::RecordExpense {
                expense_name: None,
                amount: None,
                category: "inventory".to_string(),
            }
        );
    }

    #[test]
    fn test_analytics_defaults() {
        assert_eq!(
            normalize(&json!({"action": "analytics"})),
            Command::Analytics {
                metric: AnalyticsMetric::Profit,
                period: AnalyticsPeriod::Today,
                payment_split: None,
            }
        );
        assert_eq!(
            normalize(&json!({"action": "revenue", "period": "this month", "split": "yes"})),
            Command::Analytics {
                metric: AnalyticsMetric::Revenue,
                period: AnalyticsPeriod::Month,
                payment_split: Some(true),
            }
        );
    }

    #[test]
    fn test_invoice_items_and_send_email_default() {
        let cmd = normalize(&json!({
            "action": "invoice",
            "to": "ada@shop.io",
            "items": [
                {"name": "rice", "qty": 2, "price": "4"},
                {"qty": 1, "price": 9}
            ]
        }));
        assert_eq!(
            cmd,
            Command::CreateInvoice {
                to: Some("ada@shop.io".to_string()),
                items: vec![LineItem {
                    name: "rice".to_string(),
                    quantity: 2.0,
                    unit_price: 4.0,
                }],
                note: None,
                send_email: true,
            }
        );
    }

    #[test]
    fn test_unrecognized_action_becomes_unknown() {
        assert_eq!(
            normalize(&json!({"action": "dance"})),
            Command::unknown(FALLBACK_ASK)
        );
        assert_eq!(normalize(&json!("not an object")), Command::unknown(FALLBACK_ASK));
    }
}
