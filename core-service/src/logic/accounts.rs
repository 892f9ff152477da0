//! Seed accounts shown beside the simulation. Illustrative only; the
//! simulation never touches them.

use chrono::{DateTime, Duration, Utc};
use once_cell::sync::Lazy;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Account {
    pub account_number: String, // masked
    pub holder: String,
    pub balance: f64,
    pub pin: String,
    pub last_activity: DateTime<Utc>,
}

static SEED_ACCOUNTS: Lazy<Vec<Account>> = Lazy::new(|| {
    let now = Utc::now();
    vec![
        Account {
            account_number: "**** **** **** 4821".to_string(),
            holder: "J. Alvarez".to_string(),
            balance: 12_450.75,
            pin: "4821".to_string(),
            last_activity: now - Duration::minutes(12),
        },
        Account {
            account_number: "**** **** **** 7390".to_string(),
            holder: "M. Okafor".to_string(),
            balance: 3_208.10,
            pin: "1957".to_string(),
            last_activity: now - Duration::hours(3),
        },
        Account {
            account_number: "**** **** **** 0164".to_string(),
            holder: "S. Lindqvist".to_string(),
            balance: 58_910.00,
            pin: "6603".to_string(),
            last_activity: now - Duration::days(1),
        },
    ]
});

pub fn seed_accounts() -> &'static [Account] {
    &SEED_ACCOUNTS
}
