use payportal::domain::order::{Amount, PaymentRequest};
use rust_decimal::Decimal;
use serde_json::{Value, json};
use std::io::{Error, Write};
use tempfile::NamedTempFile;

pub fn payment_request(email: &str, amount: Decimal) -> PaymentRequest {
    PaymentRequest {
        amount: Amount::new(amount).unwrap(),
        currency: "INR".to_string(),
        customer_name: "Test Customer".to_string(),
        customer_email: email.to_string(),
        description: Some("Payment for services".to_string()),
    }
}

pub fn create_line(email: &str, amount: &str) -> Value {
    json!({
        "op": "create_order",
        "amount": amount,
        "currency": "INR",
        "customer_name": "Test Customer",
        "customer_email": email,
    })
}

pub fn webhook_line(order_ref: Option<usize>, payload: Value) -> Value {
    match order_ref {
        Some(position) => json!({"op": "webhook", "order_ref": position, "payload": payload}),
        None => json!({"op": "webhook", "payload": payload}),
    }
}

/// Writes raw journal lines to a temporary file.
pub fn journal<I, S>(lines: I) -> Result<NamedTempFile, Error>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut file = NamedTempFile::new()?;
    for line in lines {
        writeln!(file, "{}", line.as_ref())?;
    }
    file.flush()?;
    Ok(file)
}
