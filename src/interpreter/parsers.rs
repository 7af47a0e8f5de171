//! Pattern-based intent extractors, tried in a fixed order per statement.

use regex::Regex;
use std::sync::LazyLock;

use super::command::{AnalyticsMetric, Command, DocumentKind, LineItem};
use crate::core::shared::models::{AnalyticsPeriod, PaymentStatus};

pub const CLARIFICATION_PROMPT: &str = "I couldn't work that out. Try something like \"sold 2 rice for $4\", \"paid 20 for transport\" or \"profit this month\".";

pub type Parser = fn(&str) -> Option<Command>;

/// Priority order matters: the first parser that returns a command wins.
pub const PARSERS: &[(&str, Parser)] = &[
    ("email", parse_email),
    ("invoice", parse_invoice),
    ("analytics", parse_analytics),
    ("sale", parse_sale),
    ("expense", parse_expense),
    ("stock_purchase", parse_stock_purchase),
    ("stock_removal", parse_stock_removal),
    ("create_product", parse_create_product),
];

static EMAIL_ADDRESS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z0-9._%+\-]+@[A-Za-z0-9.\-]+\.[A-Za-z]{2,}").expect("Invalid email regex")
});

static SUBJECT_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\bsubject\s*:\s*(.+?)\s*(?:\b(?:message|body)\s*:|$)")
        .expect("Invalid subject regex")
});

static MESSAGE_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\b(?:message|body)\s*:\s*(.+?)\s*(?:\bsubject\s*:|$)")
        .expect("Invalid message regex")
});

static EMAIL_PHRASES: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:please\s+)?(?:(?:send|write|shoot|drop)\s+)?(?:an?\s+)?(?:e-?mail|mail|message|note)\b(?:\s+to\b)?|\b(?:send|write)\b(?:\s+to\b)?")
        .expect("Invalid email phrase regex")
});

static NOTE_LABEL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)\bnote\s*:\s*(.+)$").expect("Invalid note regex"));

static LINE_ITEM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(?:x\s+)?([a-z][a-z0-9 '\-]*?)\s*(?:\bat\b|@|\bfor\b|\bx\b)\s*\$?\s*(\d[\d,]*(?:\.\d+)?)")
        .expect("Invalid line item regex")
});

static SALE: LazyLock<Regex> = LazyLock::new(|| verb_regex("sold"));

static STOCK_PURCHASE: LazyLock<Regex> =
    LazyLock::new(|| verb_regex("bought|purchased|restocked"));

static STOCK_REMOVAL: LazyLock<Regex> = LazyLock::new(|| {
    verb_regex("removed|damaged|lost|spoiled|expired|wasted|threw\\s+away|wrote\\s+off")
});

static UNIT_PRICE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(?:\bfor\b|\bat\b|@)\s*\$?\s*(\d[\d,]*(?:\.\d+)?)").expect("Invalid price regex")
});

/// A minus only counts as a sign when it touches the glyph or the digits.
static MONEY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:(?P<neg>-)[$€£₦]?|[$€£₦](?P<neg2>-)?\s*)?(?P<num>\d[\d,]*(?:\.\d+)?)")
        .expect("Invalid money regex")
});

static CREATE_PRODUCT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)\b(?:add|new|create|register)\s+(?:a\s+)?(?:new\s+)?product\b\s*:?\s*(.*)$")
        .expect("Invalid create product regex")
});

static REORDER_THRESHOLD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:reorder(?:\s+(?:at|level|threshold|point))?|threshold|min(?:imum)?(?:\s+stock)?)\s*(?:of|at|is|=|:)?\s*(\d+(?:\.\d+)?)")
        .expect("Invalid threshold regex")
});

fn verb_regex(verbs: &str) -> Regex {
    Regex::new(&format!(
        r"(?is)\b(?:{verbs})\b\s*(?:(\d+(?:\.\d+)?)(?:\s*x\b)?(?:\s+|$))?(.*)$"
    ))
    .expect("Invalid verb regex")
}

const NAME_STOP_WORDS: &[&str] = &[
    "for", "at", "to", "each", "on", "per", "from", "with", "today", "yesterday", "@",
];

const NAME_FILLER_WORDS: &[&str] = &[
    "of", "a", "an", "the", "x", "some", "more", "new", "my", "our", "bags", "bag", "pcs", "pc",
    "pieces", "piece", "packs", "pack", "packets", "packet", "boxes", "box", "cartons", "carton",
    "crates", "crate", "bottles", "bottle", "kg", "kgs", "kilos", "kilo", "grams", "g", "lbs",
    "lb", "litres", "liters", "litre", "liter", "units", "unit", "dozen", "sacks", "sack", "tins",
    "tin", "rolls", "roll",
];

const EXPENSE_CONNECTORS: &[&str] = &[
    "i", "we", "just", "paid", "pay", "spent", "spend", "expense", "expenses", "for", "on", "to",
    "the", "a", "an", "of", "my", "our", "today", "yesterday", "usd", "dollars", "dollar", "bucks",
    "naira", "cost", "costs", "was", "is",
];

const EMAIL_LEADING_WORDS: &[&str] = &["to", "saying", "that", "and", "say", "tell", "them"];

fn words(lower: &str) -> impl Iterator<Item = &str> {
    lower.split(|c: char| !c.is_alphanumeric()).filter(|w| !w.is_empty())
}

fn has_word(lower: &str, word: &str) -> bool {
    words(lower).any(|w| w == word)
}

fn has_any_word(lower: &str, candidates: &[&str]) -> bool {
    words(lower).any(|w| candidates.contains(&w))
}

pub fn parse_number(raw: &str) -> Option<f64> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !matches!(*c, ',' | '$' | '€' | '£' | '₦' | ' '))
        .collect();
    cleaned.parse::<f64>().ok().filter(|n| n.is_finite())
}

/// Drops leading unit and filler words ("bags of") and rejects purely numeric names.
pub fn clean_product_name(raw: &str) -> Option<String> {
    let tokens: Vec<&str> = raw
        .split_whitespace()
        .map(|t| t.trim_matches(|c: char| matches!(c, ',' | '.' | '!' | '?' | '(' | ')' | '"')))
        .filter(|t| !t.is_empty())
        .collect();

    let start = tokens
        .iter()
        .position(|t| !NAME_FILLER_WORDS.contains(&t.to_lowercase().as_str()))?;
    let mut kept: Vec<&str> = tokens[start..].to_vec();
    while kept
        .last()
        .is_some_and(|t| t.eq_ignore_ascii_case("each"))
    {
        kept.pop();
    }

    let name = kept.join(" ");
    if name.is_empty() || name.chars().all(|c| c.is_ascii_digit() || c == '.') {
        None
    } else {
        Some(name)
    }
}

/// Collects words up to the first delimiter (`for`, `at`, `@`, `to`, a price, a comma).
fn take_name(text: &str) -> Option<String> {
    let mut taken = Vec::new();
    for raw in text.split_whitespace() {
        if raw.starts_with('$') || raw.starts_with('@') {
            break;
        }
        let (word, ends_clause) = match raw.find(|c: char| c == ',' || c == '@') {
            Some(idx) => (&raw[..idx], true),
            None => (raw, false),
        };
        let lower = word.to_lowercase();
        if NAME_STOP_WORDS.contains(&lower.as_str()) {
            break;
        }
        if !word.is_empty() {
            taken.push(word);
        }
        if ends_clause {
            break;
        }
    }
    clean_product_name(&taken.join(" "))
}

fn strip_leading_words<'a>(mut s: &'a str, candidates: &[&str]) -> &'a str {
    loop {
        let trimmed = s.trim_start_matches(|c: char| c.is_whitespace() || matches!(c, ',' | ':' | '-'));
        let end = trimmed.find(char::is_whitespace).unwrap_or(trimmed.len());
        let word = &trimmed[..end];
        if !word.is_empty() && candidates.iter().any(|c| c.eq_ignore_ascii_case(word)) {
            s = &trimmed[end..];
        } else {
            return trimmed;
        }
    }
}

fn non_blank(s: &str) -> Option<String> {
    let trimmed = s.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

pub fn parse_email(statement: &str) -> Option<Command> {
    let lower = statement.to_lowercase();
    if has_any_word(&lower, &["invoice", "receipt"]) {
        return None;
    }
    if !has_any_word(&lower, &["email", "mail", "send", "message", "write"]) {
        return None;
    }
    let to = EMAIL_ADDRESS.find(statement)?.as_str().to_string();

    let subject = SUBJECT_LABEL
        .captures(statement)
        .and_then(|c| c.get(1))
        .and_then(|m| non_blank(m.as_str()));
    let labelled_message = MESSAGE_LABEL
        .captures(statement)
        .and_then(|c| c.get(1))
        .and_then(|m| non_blank(m.as_str()));

    let message = labelled_message.or_else(|| {
        if subject.is_some() {
            return None;
        }
        let without_address = EMAIL_ADDRESS.replace_all(statement, " ");
        let without_phrases = EMAIL_PHRASES.replace_all(&without_address, " ");
        let body = strip_leading_words(&without_phrases, EMAIL_LEADING_WORDS);
        let collapsed = body.split_whitespace().collect::<Vec<_>>().join(" ");
        non_blank(&collapsed)
    });

    Some(Command::SendEmail {
        to: Some(to),
        subject,
        message,
    })
}

pub fn parse_invoice(statement: &str) -> Option<Command> {
    let lower = statement.to_lowercase();
    let kind = if has_word(&lower, "receipt") {
        DocumentKind::Receipt
    } else if has_word(&lower, "invoice") {
        DocumentKind::Invoice
    } else {
        return None;
    };
    let to = EMAIL_ADDRESS.find(statement)?.as_str().to_string();

    let without_address = EMAIL_ADDRESS.replace_all(statement, " ");
    let note = NOTE_LABEL
        .captures(&without_address)
        .and_then(|c| c.get(1))
        .and_then(|m| non_blank(m.as_str()));
    let body = NOTE_LABEL.replace(&without_address, "");

    let items: Vec<LineItem> = LINE_ITEM
        .captures(&body)
        .and_then(|c| {
            let quantity = parse_number(c.get(1)?.as_str())?;
            let name = clean_product_name(c.get(2)?.as_str())?;
            let unit_price = parse_number(c.get(3)?.as_str())?;
            Some(LineItem {
                name,
                quantity,
                unit_price,
            })
        })
        .into_iter()
        .collect();

    let send_email = !["don't email", "dont email", "do not email", "no email", "without email", "don't send", "do not send"]
        .iter()
        .any(|p| lower.contains(p));

    Some(match kind {
        DocumentKind::Invoice => Command::CreateInvoice {
            to: Some(to),
            items,
            note,
            send_email,
        },
        DocumentKind::Receipt => Command::CreateReceipt {
            to: Some(to),
            items,
            note,
            send_email,
        },
    })
}

pub fn parse_analytics(statement: &str) -> Option<Command> {
    let lower = statement.to_lowercase();

    let top = [
        "top selling",
        "top-selling",
        "best selling",
        "best-selling",
        "top products",
        "top sellers",
        "best sellers",
    ]
    .iter()
    .any(|p| lower.contains(p));
    let revenue = has_word(&lower, "revenue");
    let expenses = has_word(&lower, "expenses");
    let profit = has_any_word(&lower, &["profit", "profits"]);

    if !(top || revenue || expenses || profit) {
        return None;
    }
    // "paid 30 for office expenses" records an expense, it doesn't ask about expenses.
    if has_any_word(&lower, &["paid", "spent", "sold", "bought", "purchased"])
        && lower.chars().any(|c| c.is_ascii_digit())
    {
        return None;
    }

    let metric = if top {
        AnalyticsMetric::TopProducts
    } else if revenue {
        AnalyticsMetric::Revenue
    } else if expenses {
        AnalyticsMetric::Expenses
    } else {
        AnalyticsMetric::Profit
    };

    let period = if lower.contains("month") {
        AnalyticsPeriod::Month
    } else {
        AnalyticsPeriod::Today
    };

    let payment_split = has_any_word(&lower, &["unpaid", "split", "breakdown"]).then_some(true);

    Some(Command::Analytics {
        metric,
        period,
        payment_split,
    })
}

pub fn parse_sale(statement: &str) -> Option<Command> {
    let lower = statement.to_lowercase();
    if !has_word(&lower, "sold") {
        return None;
    }
    let caps = SALE.captures(statement)?;
    let quantity = caps.get(1).and_then(|m| parse_number(m.as_str()));
    let rest = caps.get(2).map(|m| m.as_str()).unwrap_or_default();
    let product_name = take_name(rest);

    let unit_price = UNIT_PRICE
        .captures(rest)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_number(m.as_str()))
        .unwrap_or(0.0);

    let unpaid = has_any_word(&lower, &["unpaid", "owes", "owing"])
        || ["on credit", "not paid", "hasn't paid", "has not paid", "didn't pay", "will pay later"]
            .iter()
            .any(|p| lower.contains(p));

    Some(Command::RecordSale {
        product_name,
        quantity,
        unit_price,
        payment_status: if unpaid {
            PaymentStatus::Unpaid
        } else {
            PaymentStatus::Paid
        },
    })
}

pub fn parse_expense(statement: &str) -> Option<Command> {
    let lower = statement.to_lowercase();
    if !has_any_word(&lower, &["paid", "spent", "expense"]) {
        return None;
    }

    let caps = MONEY.captures(statement)?;
    let negative = caps.name("neg").is_some() || caps.name("neg2").is_some();
    let value = parse_number(caps.name("num")?.as_str())?;
    let amount = if negative { -value } else { value };
    if amount <= 0.0 {
        return None;
    }

    let mut remainder = String::with_capacity(statement.len());
    remainder.push_str(&statement[..caps.get(0)?.start()]);
    remainder.push(' ');
    remainder.push_str(&statement[caps.get(0)?.end()..]);

    let name_words: Vec<&str> = remainder
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .filter(|w| !w.is_empty())
        .filter(|w| !w.chars().all(|c| c.is_ascii_digit() || c == '.' || c == ','))
        .filter(|w| !EXPENSE_CONNECTORS.contains(&w.to_lowercase().as_str()))
        .collect();
    let expense_name = non_blank(&name_words.join(" "));

    let category = if has_any_word(&lower, &["inventory", "stock", "restock", "restocking", "restocked"]) {
        "inventory"
    } else {
        "general"
    };

    Some(Command::RecordExpense {
        expense_name,
        amount: Some(amount),
        category: category.to_string(),
    })
}

pub fn parse_stock_purchase(statement: &str) -> Option<Command> {
    let lower = statement.to_lowercase();
    if !has_any_word(&lower, &["bought", "purchased", "restocked"]) {
        return None;
    }
    let caps = STOCK_PURCHASE.captures(statement)?;
    let quantity = caps
        .get(1)
        .and_then(|m| parse_number(m.as_str()))
        .unwrap_or(1.0);
    let product_name = caps.get(2).and_then(|m| take_name(m.as_str()));

    Some(Command::AddStock {
        product_name,
        quantity: Some(quantity),
    })
}

pub fn parse_stock_removal(statement: &str) -> Option<Command> {
    let caps = STOCK_REMOVAL.captures(statement)?;
    let quantity = caps
        .get(1)
        .and_then(|m| parse_number(m.as_str()))
        .unwrap_or(1.0);
    let product_name = caps.get(2).and_then(|m| take_name(m.as_str()))?;

    Some(Command::RemoveStock {
        product_name: Some(product_name),
        quantity: Some(quantity),
    })
}

pub fn parse_create_product(statement: &str) -> Option<Command> {
    let caps = CREATE_PRODUCT.captures(statement)?;
    let rest = caps.get(1).map(|m| m.as_str()).unwrap_or_default();

    let reorder_threshold = REORDER_THRESHOLD
        .captures(rest)
        .and_then(|c| c.get(1))
        .and_then(|m| parse_number(m.as_str()));
    let name_part = REORDER_THRESHOLD.replace(rest, "");
    let product_name = take_name(strip_leading_words(&name_part, &["called", "named"]));

    Some(Command::CreateProduct {
        product_name,
        reorder_threshold,
    })
}

/// Runs the parser bank over one statement; unmatched statements ask for clarification.
pub fn parse_statement(statement: &str) -> Command {
    PARSERS
        .iter()
        .find_map(|(_, parser)| parser(statement))
        .unwrap_or_else(|| Command::unknown(CLARIFICATION_PROMPT))
}

/// Keeps a single clarification when nothing resolved, otherwise drops every unknown.
pub fn collapse_unknowns(commands: Vec<Command>) -> Vec<Command> {
    if commands.iter().all(Command::is_unknown) {
        commands.into_iter().take(1).collect()
    } else {
        commands.into_iter().filter(|c| !c.is_unknown()).collect()
    }
}

pub fn parse_statements(statements: &[String]) -> Vec<Command> {
    collapse_unknowns(statements.iter().map(|s| parse_statement(s)).collect())
}
