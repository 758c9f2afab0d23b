//! Monetary amounts are integer cents end to end. Formatting to BRL only
//! happens at the edge, for `*_display` fields.

pub type Cents = i64;

/// Formats cents as Brazilian reais: `123456` -> `R$ 1.234,56`.
pub fn format_brl(cents: Cents) -> String {
    let negative = cents < 0;
    let abs = cents.unsigned_abs();
    let reais = abs / 100;
    let centavos = abs % 100;

    let digits = reais.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push('.');
        }
        grouped.push(ch);
    }

    if negative {
        format!("-R$ {},{:02}", grouped, centavos)
    } else {
        format!("R$ {},{:02}", grouped, centavos)
    }
}

/// `amount * percent / 100`, rounded down to the cent. Saturates at the
/// `Cents` range instead of overflowing.
pub fn percent_of(amount: Cents, percent: i32) -> Cents {
    let value = amount as i128 * percent as i128 / 100;
    Cents::try_from(value).unwrap_or(if value < 0 { Cents::MIN } else { Cents::MAX })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_thousands_and_cents() {
        assert_eq!(format_brl(0), "R$ 0,00");
        assert_eq!(format_brl(5), "R$ 0,05");
        assert_eq!(format_brl(123456), "R$ 1.234,56");
        assert_eq!(format_brl(100_000_000), "R$ 1.000.000,00");
        assert_eq!(format_brl(-2550), "-R$ 25,50");
    }

    #[test]
    fn percent_rounds_down() {
        assert_eq!(percent_of(10_000, 7), 700);
        assert_eq!(percent_of(999, 10), 99);
    }

    #[test]
    fn percent_of_huge_amounts_does_not_overflow() {
        assert_eq!(percent_of(Cents::MAX, 100), Cents::MAX);
        assert_eq!(percent_of(Cents::MAX, 10), Cents::MAX / 10);
        assert_eq!(percent_of(Cents::MAX, 250), Cents::MAX);
    }
}
