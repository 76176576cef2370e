// Copyright (c) 2024 Spare Change Developers
// Distributed under the MIT software license

/// Group digits by thousands: `12345` -> `12 345`
pub fn number(num: u64) -> String {
    let digits: Vec<char> = num.to_string().chars().collect();
    let mut number = String::with_capacity(digits.len() + digits.len() / 3);
    for (index, c) in digits.iter().enumerate() {
        if index != 0 && (digits.len() - index) % 3 == 0 {
            number.push(' ');
        }
        number.push(*c);
    }
    number
}

pub fn sats(amount: u64) -> String {
    format!("{} sats", number(amount))
}

/// Summary shown above the coin list
pub fn coins_summary(eligible: usize, total: usize) -> String {
    format!("{eligible}/{total} coins meet the specified criteria")
}

/// Notification shown when auto-donate is off
pub fn coins_available(count: usize, total: u64) -> String {
    format!(
        "You have {count} coins eligible for donation totaling {}.",
        sats(total)
    )
}

/// Notification shown after an automatic donation
pub fn auto_donated(count: usize, total: u64) -> String {
    format!("Auto-donated {count} coins, {}", sats(total))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_number() {
        assert_eq!(number(0), "0");
        assert_eq!(number(770), "770");
        assert_eq!(number(10_500), "10 500");
        assert_eq!(number(200_000), "200 000");
        assert_eq!(number(1_000_000), "1 000 000");
    }

    #[test]
    fn test_messages() {
        assert_eq!(coins_summary(3, 7), "3/7 coins meet the specified criteria");
        assert_eq!(auto_donated(2, 2_626), "Auto-donated 2 coins, 2 626 sats");
        assert_eq!(
            coins_available(1, 5_000),
            "You have 1 coins eligible for donation totaling 5 000 sats."
        );
    }
}
