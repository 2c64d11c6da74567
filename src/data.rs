//! Mock transaction data generator
//!
//! Produces realistic UK banking transaction data for demos and tests.
//! Seeded so every run is reproducible. In production this module is
//! replaced by the real transaction API.

use chrono::{Datelike, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

//
// ================= Data model =================
//

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Groceries,
    EatingOut,
    Transport,
    Utilities,
    Subscriptions,
    Shopping,
    Entertainment,
    Health,
    Salary,
    SavingsTransfer,
    CashWithdrawal,
    Other,
}

impl Category {
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Groceries => "groceries",
            Category::EatingOut => "eating_out",
            Category::Transport => "transport",
            Category::Utilities => "utilities",
            Category::Subscriptions => "subscriptions",
            Category::Shopping => "shopping",
            Category::Entertainment => "entertainment",
            Category::Health => "health",
            Category::Salary => "salary",
            Category::SavingsTransfer => "savings_transfer",
            Category::CashWithdrawal => "cash_withdrawal",
            Category::Other => "other",
        }
    }

    /// Parse a category name as users type it ("eating out" or "eating_out").
    pub fn parse(raw: &str) -> Option<Category> {
        match raw.trim().to_lowercase().replace(' ', "_").as_str() {
            "groceries" => Some(Category::Groceries),
            "eating_out" => Some(Category::EatingOut),
            "transport" => Some(Category::Transport),
            "utilities" => Some(Category::Utilities),
            "subscriptions" => Some(Category::Subscriptions),
            "shopping" => Some(Category::Shopping),
            "entertainment" => Some(Category::Entertainment),
            "health" => Some(Category::Health),
            "salary" => Some(Category::Salary),
            "savings_transfer" => Some(Category::SavingsTransfer),
            "cash_withdrawal" => Some(Category::CashWithdrawal),
            "other" => Some(Category::Other),
            _ => None,
        }
    }

    /// Human-readable label ("eating_out" → "Eating Out").
    pub fn label(&self) -> String {
        self.as_str()
            .split('_')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub transaction_id: String,
    pub date: NaiveDate,
    /// Negative = debit, positive = credit. Integer pence throughout.
    pub amount_pence: i64,
    pub merchant: String,
    pub category: Category,
    pub channel: String,
    pub balance_after_pence: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomerProfile {
    pub customer_id: String,
    pub name: String,
    pub monthly_salary_pence: i64,
    pub salary_day: u32,
    pub transactions: Vec<Transaction>,
}

//
// ================= Merchant registry =================
//

fn merchants(category: Category) -> &'static [&'static str] {
    match category {
        Category::Groceries => &["Tesco", "Sainsbury's", "Aldi", "Asda", "Waitrose"],
        Category::EatingOut => &["Pret a Manger", "Greggs", "Nando's", "Deliveroo", "Costa Coffee"],
        Category::Transport => &["TfL", "National Rail", "Shell", "Uber", "Trainline"],
        Category::Utilities => &["British Gas", "EDF Energy", "Thames Water", "BT Broadband"],
        Category::Subscriptions => &["Netflix", "Spotify", "Amazon Prime", "Gym Membership"],
        Category::Shopping => &["Amazon", "ASOS", "Next", "John Lewis", "eBay"],
        Category::Entertainment => &["Odeon Cinema", "Ticketmaster", "Steam"],
        Category::Health => &["Boots", "Day Lewis Pharmacy", "Bupa"],
        Category::CashWithdrawal => &["ATM Withdrawal"],
        Category::Other => &["Misc Charge", "Bank Fee"],
        Category::Salary => &["BACS PAYROLL - Employer Ltd"],
        Category::SavingsTransfer => &["Transfer to Savings"],
    }
}

/// Typical per-transaction spend range in pence, and monthly frequency.
fn spend_profile(category: Category) -> Option<((i64, i64), u32)> {
    match category {
        Category::Groceries => Some(((6_000, 20_000), 6)),
        Category::EatingOut => Some(((800, 4_500), 5)),
        Category::Transport => Some(((500, 15_000), 6)),
        Category::Utilities => Some(((3_000, 12_000), 3)),
        Category::Subscriptions => Some(((499, 1_499), 4)),
        Category::Shopping => Some(((1_500, 18_000), 3)),
        Category::Entertainment => Some(((1_000, 6_000), 2)),
        Category::Health => Some(((500, 4_000), 1)),
        Category::CashWithdrawal => Some(((2_000, 10_000), 1)),
        Category::Other => Some(((500, 2_500), 1)),
        Category::Salary | Category::SavingsTransfer => None,
    }
}

const SPENDING_CATEGORIES: &[Category] = &[
    Category::Groceries,
    Category::EatingOut,
    Category::Transport,
    Category::Utilities,
    Category::Subscriptions,
    Category::Shopping,
    Category::Entertainment,
    Category::Health,
    Category::CashWithdrawal,
    Category::Other,
];

//
// ================= Generator =================
//

/// Walk back `months` calendar months from today, landing on the 1st.
pub fn months_ago(months: u32) -> NaiveDate {
    let today = Utc::now().date_naive();
    let total = today.year() * 12 + today.month() as i32 - 1 - months as i32;
    let year = total.div_euclid(12);
    let month = (total.rem_euclid(12) + 1) as u32;
    NaiveDate::from_ymd_opt(year, month, 1).unwrap_or(today)
}

/// Generate a reproducible mock customer. Deterministic via seed so demos
/// and tests see identical histories within a run window.
pub fn generate_customer(
    customer_id: &str,
    name: &str,
    monthly_salary_pence: i64,
    months: u32,
    seed: u64,
) -> CustomerProfile {
    let mut rng = StdRng::seed_from_u64(seed);

    let mut profile = CustomerProfile {
        customer_id: customer_id.to_string(),
        name: name.to_string(),
        monthly_salary_pence,
        salary_day: 25,
        transactions: Vec::new(),
    };

    let mut balance: i64 = 250_000;
    let mut txn_counter: u32 = 0;

    for offset in (0..months).rev() {
        let month_start = months_ago(offset);
        let (year, month) = (month_start.year(), month_start.month());

        // Salary credit
        let salary_date =
            NaiveDate::from_ymd_opt(year, month, profile.salary_day).unwrap_or(month_start);
        balance += monthly_salary_pence;
        profile.transactions.push(Transaction {
            transaction_id: format!("TXN_{:05}", txn_counter),
            date: salary_date,
            amount_pence: monthly_salary_pence,
            merchant: "BACS PAYROLL - Employer Ltd".to_string(),
            category: Category::Salary,
            channel: "bacs".to_string(),
            balance_after_pence: balance,
        });
        txn_counter += 1;

        // Spending transactions
        for &category in SPENDING_CATEGORIES {
            let Some(((lo, hi), freq)) = spend_profile(category) else {
                continue;
            };
            for _ in 0..freq {
                let amount = rng.gen_range(lo..=hi);
                let day = rng.gen_range(1..=28);
                let date = NaiveDate::from_ymd_opt(year, month, day).unwrap_or(month_start);
                let merchant_pool = merchants(category);
                let merchant = merchant_pool[rng.gen_range(0..merchant_pool.len())];
                balance -= amount;
                profile.transactions.push(Transaction {
                    transaction_id: format!("TXN_{:05}", txn_counter),
                    date,
                    amount_pence: -amount,
                    merchant: merchant.to_string(),
                    category,
                    channel: "card".to_string(),
                    balance_after_pence: balance,
                });
                txn_counter += 1;
            }
        }
    }

    profile.transactions.sort_by_key(|t| t.date);
    profile
}

/// Single reproducible demo customer with 12 months of history.
pub fn demo_customer() -> CustomerProfile {
    generate_customer("CUST_DEMO_001", "Alex Johnson", 320_000, 12, 42)
}

/// Demo customer with life-event signals injected into recent transactions:
/// nursery payments + baby equipment, property purchase fees, and a salary
/// increase — designed to trigger every life-event detector.
pub fn demo_customer_with_life_events() -> CustomerProfile {
    let mut profile = generate_customer("CUST_DEMO_002", "Alex Johnson", 320_000, 12, 42);

    let today = Utc::now().date_naive();
    let mut balance = profile
        .transactions
        .last()
        .map(|t| t.balance_after_pence)
        .unwrap_or(250_000);
    let mut txn_counter: u32 = 9000;

    let mut add_debit = |profile: &mut CustomerProfile,
                         days_ago: i64,
                         amount: i64,
                         merchant: &str,
                         category: Category,
                         channel: &str| {
        balance -= amount;
        profile.transactions.push(Transaction {
            transaction_id: format!("TXN_{:05}", txn_counter),
            date: today - chrono::Duration::days(days_ago),
            amount_pence: -amount,
            merchant: merchant.to_string(),
            category,
            channel: channel.to_string(),
            balance_after_pence: balance,
        });
        txn_counter += 1;
    };

    // New baby: two nursery direct debits plus equipment purchases
    add_debit(&mut profile, 35, 85_000, "Busy Bees Nursery", Category::Other, "direct_debit");
    add_debit(&mut profile, 5, 85_000, "Busy Bees Nursery", Category::Other, "direct_debit");
    add_debit(&mut profile, 42, 64_900, "Mamas and Papas", Category::Shopping, "card");

    // Property purchase: conveyancing chain
    add_debit(&mut profile, 50, 120_000, "Morrison & Co Solicitors", Category::Other, "bank_transfer");
    add_debit(&mut profile, 48, 45_000, "RICS Surveyor Services", Category::Other, "bank_transfer");
    add_debit(&mut profile, 45, 29_900, "Land Registry Fee", Category::Other, "bank_transfer");

    // Income change: replace the two most recent salary credits with a
    // higher amount (promotion).
    let mut salary_dates: Vec<NaiveDate> = profile
        .transactions
        .iter()
        .filter(|t| t.category == Category::Salary)
        .map(|t| t.date)
        .collect();
    salary_dates.sort();
    let recent: Vec<NaiveDate> = salary_dates.iter().rev().take(2).cloned().collect();
    profile
        .transactions
        .retain(|t| !(t.category == Category::Salary && recent.contains(&t.date)));
    for (i, date) in recent.iter().enumerate() {
        balance += 380_000;
        profile.transactions.push(Transaction {
            transaction_id: format!("TXN_{:05}", txn_counter + i as u32),
            date: *date,
            amount_pence: 380_000,
            merchant: "BACS PAYROLL - Employer Ltd".to_string(),
            category: Category::Salary,
            channel: "bacs".to_string(),
            balance_after_pence: balance,
        });
    }

    profile.transactions.sort_by_key(|t| t.date);
    profile
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generator_is_deterministic() {
        let a = generate_customer("C1", "Test", 300_000, 6, 7);
        let b = generate_customer("C1", "Test", 300_000, 6, 7);
        assert_eq!(a.transactions.len(), b.transactions.len());
        assert_eq!(
            a.transactions.first().map(|t| t.amount_pence),
            b.transactions.first().map(|t| t.amount_pence)
        );
    }

    #[test]
    fn test_transactions_sorted_and_salaried() {
        let profile = demo_customer();
        let salaries = profile
            .transactions
            .iter()
            .filter(|t| t.category == Category::Salary)
            .count();
        assert_eq!(salaries, 12);
        assert!(profile
            .transactions
            .windows(2)
            .all(|pair| pair[0].date <= pair[1].date));
    }

    #[test]
    fn test_life_event_profile_carries_signals() {
        let profile = demo_customer_with_life_events();
        assert!(profile
            .transactions
            .iter()
            .any(|t| t.merchant.contains("Nursery")));
        assert!(profile
            .transactions
            .iter()
            .any(|t| t.merchant.contains("Solicitors")));
    }

    #[test]
    fn test_category_parse_round_trip() {
        assert_eq!(Category::parse("eating out"), Some(Category::EatingOut));
        assert_eq!(Category::parse("eating_out"), Some(Category::EatingOut));
        assert_eq!(Category::parse("nonsense"), None);
        assert_eq!(Category::EatingOut.label(), "Eating Out");
    }

    #[test]
    fn test_months_ago_lands_on_first() {
        let date = months_ago(3);
        assert_eq!(date.day(), 1);
        assert!(date < Utc::now().date_naive());
    }
}
