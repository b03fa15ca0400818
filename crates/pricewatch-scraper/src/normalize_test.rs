use super::*;

fn assert_price(raw: &str, expected: f64) {
    let got = normalize_price(raw).unwrap_or_else(|e| panic!("{raw:?} failed: {e}"));
    assert!(
        (got - expected).abs() < 1e-9,
        "{raw:?}: expected {expected}, got {got}"
    );
}

// -----------------------------------------------------------------------
// separator handling
// -----------------------------------------------------------------------

#[test]
fn space_thousands_with_comma_decimal() {
    assert_price("1 234,56", 1234.56);
}

#[test]
fn comma_thousands_with_dot_decimal() {
    assert_price("1,234.56", 1234.56);
}

#[test]
fn dot_thousands_with_comma_decimal() {
    assert_price("1.234,56", 1234.56);
}

#[test]
fn plain_dot_decimal() {
    assert_price("1234.56", 1234.56);
}

#[test]
fn single_comma_is_decimal() {
    assert_price("99,90", 99.9);
}

#[test]
fn repeated_dots_are_thousands() {
    assert_price("1.234.567", 1_234_567.0);
}

#[test]
fn repeated_commas_are_thousands() {
    assert_price("1,234,567", 1_234_567.0);
}

#[test]
fn mixed_with_repeated_thousands() {
    assert_price("1,234,567.89", 1_234_567.89);
    assert_price("1.234.567,89", 1_234_567.89);
}

#[test]
fn non_breaking_and_narrow_spaces_are_noise() {
    assert_price("2\u{a0}500", 2500.0);
    assert_price("12\u{202f}000,50", 12000.5);
}

// -----------------------------------------------------------------------
// currency symbols and surrounding text
// -----------------------------------------------------------------------

#[test]
fn strips_trailing_currency_symbol() {
    assert_price("2 500 ₽", 2500.0);
}

#[test]
fn strips_leading_currency_symbol() {
    assert_price("$12.99", 12.99);
}

#[test]
fn strips_trailing_abbreviation_with_dot() {
    // "р." leaves a trailing dot after filtering; it must not become a decimal.
    assert_price("1 990 р.", 1990.0);
}

#[test]
fn strips_leading_label() {
    assert_price("Цена: 3 499,00 руб.", 3499.0);
}

// -----------------------------------------------------------------------
// failures
// -----------------------------------------------------------------------

#[test]
fn empty_string_fails() {
    assert_eq!(
        normalize_price(""),
        Err(NormalizeError::Empty { raw: String::new() })
    );
}

#[test]
fn letters_only_fails() {
    assert!(matches!(
        normalize_price("abc"),
        Err(NormalizeError::Empty { .. })
    ));
}

#[test]
fn separators_only_fails() {
    assert!(matches!(
        normalize_price(" ., "),
        Err(NormalizeError::Empty { .. })
    ));
}

#[test]
fn overflowing_digits_fail() {
    let huge = "9".repeat(400);
    assert!(matches!(
        normalize_price(&huge),
        Err(NormalizeError::NotNumeric { .. })
    ));
}

#[test]
fn failure_keeps_raw_text() {
    let err = normalize_price("n/a").unwrap_err();
    assert!(err.to_string().contains("n/a"));
}
