//! Encoding and parsing of `solana:` transfer request URIs.
//!
//! # Wire Format
//!
//! ```text
//! solana:<recipient>?amount=<amount>&spl-token=<mint>&reference=<ref>&label=<label>&message=<message>&memo=<memo>
//! ```
//!
//! The recipient is the base58 address in the URI path. Query parameters are
//! form-urlencoded and emitted only when the field is present, in the order
//! shown; `reference` repeats once per reference.
//!
//! # Validation
//!
//! [`parse_url`] checks the input in a fixed order and stops at the first
//! failure, so every malformed URI maps to exactly one [`ParseUrlError`]:
//! length, URL syntax, scheme, path, recipient, `amount`, `spl-token`,
//! `reference`. Unknown query parameters are ignored.

use std::borrow::Cow;
use std::str::FromStr;

use url::{Url, form_urlencoded};

use crate::address::Address;
use crate::amount::{Amount, AmountError};
use crate::request::TransferRequest;

/// URI scheme of Solana Pay requests, without the trailing colon.
pub const SOLANA_PROTOCOL: &str = "solana";

/// Longest text input [`parse_url`] accepts, in characters.
pub const MAX_URL_LENGTH: usize = 2048;

/// Query parameter carrying the amount.
pub const AMOUNT_PARAM: &str = "amount";
/// Query parameter carrying the SPL token mint.
pub const SPL_TOKEN_PARAM: &str = "spl-token";
/// Repeatable query parameter carrying a reference.
pub const REFERENCE_PARAM: &str = "reference";
/// Query parameter carrying the label.
pub const LABEL_PARAM: &str = "label";
/// Query parameter carrying the message.
pub const MESSAGE_PARAM: &str = "message";
/// Query parameter carrying the memo.
pub const MEMO_PARAM: &str = "memo";

/// Reasons a URI is rejected as a transfer request.
///
/// Each variant is a distinct, stable kind. Display strings are short
/// lower-case phrases suitable for logs.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseUrlError {
    /// Text input is longer than [`MAX_URL_LENGTH`].
    #[error("length invalid")]
    LengthInvalid,
    /// Text input is not a URL at all.
    #[error("url malformed: {0}")]
    UrlMalformed(#[from] url::ParseError),
    /// Scheme is not `solana`.
    #[error("protocol invalid")]
    ProtocolInvalid,
    /// The recipient path segment is empty.
    #[error("pathname missing")]
    PathnameMissing,
    /// The recipient is not a valid address.
    #[error("recipient invalid")]
    RecipientInvalid,
    /// `amount` is not an unsigned decimal.
    #[error("amount invalid")]
    AmountInvalid,
    /// `amount` matched the decimal pattern but did not parse as a number.
    #[error("amount NaN")]
    AmountNaN,
    /// `amount` is below zero.
    #[error("amount negative")]
    AmountNegative,
    /// `spl-token` is not a valid address.
    #[error("spl-token invalid")]
    SplTokenInvalid,
    /// At least one `reference` is not a valid address.
    #[error("reference invalid")]
    ReferenceInvalid,
}

impl From<AmountError> for ParseUrlError {
    fn from(e: AmountError) -> Self {
        match e {
            AmountError::Invalid(_) => Self::AmountInvalid,
            AmountError::NotANumber(_) => Self::AmountNaN,
            AmountError::Negative(_) => Self::AmountNegative,
        }
    }
}

/// Encodes a request as URI text.
#[must_use]
pub fn encode(request: &TransferRequest) -> String {
    let mut query = form_urlencoded::Serializer::new(String::new());
    let mut has_query = false;
    let mut append = |key: &str, value: &str| {
        query.append_pair(key, value);
        has_query = true;
    };

    if let Some(amount) = request.amount() {
        append(AMOUNT_PARAM, &amount.to_string());
    }
    if let Some(mint) = request.spl_token() {
        append(SPL_TOKEN_PARAM, &mint.to_string());
    }
    for reference in request.reference().unwrap_or_default() {
        append(REFERENCE_PARAM, &reference.to_string());
    }
    if let Some(label) = request.label() {
        append(LABEL_PARAM, label);
    }
    if let Some(message) = request.message() {
        append(MESSAGE_PARAM, message);
    }
    if let Some(memo) = request.memo() {
        append(MEMO_PARAM, memo);
    }

    let mut uri = format!("{SOLANA_PROTOCOL}:{}", request.recipient());
    if has_query {
        uri.push('?');
        uri.push_str(&query.finish());
    }
    uri
}

/// Encodes a request as a [`Url`].
///
/// # Panics
///
/// Never in practice: a base58 path and a form-urlencoded query always form
/// a valid URL.
#[must_use]
pub fn encode_url(request: &TransferRequest) -> Url {
    Url::parse(&encode(request)).expect("Encoded transfer request is a valid URL")
}

/// Parses URI text into a transfer request.
///
/// # Errors
///
/// Returns [`ParseUrlError::LengthInvalid`] for text longer than
/// [`MAX_URL_LENGTH`] characters, [`ParseUrlError::UrlMalformed`] if the text
/// is not a URL, and otherwise the first failure reported by [`from_url`].
pub fn parse_url(text: &str) -> Result<TransferRequest, ParseUrlError> {
    if text.chars().count() > MAX_URL_LENGTH {
        return Err(ParseUrlError::LengthInvalid);
    }
    let url = Url::parse(text)?;
    from_url(&url)
}

/// Parses an already-parsed [`Url`] into a transfer request.
///
/// No length check is applied.
///
/// # Errors
///
/// Returns the first failing [`ParseUrlError`] in validation order.
pub fn from_url(url: &Url) -> Result<TransferRequest, ParseUrlError> {
    if url.scheme() != SOLANA_PROTOCOL {
        return Err(ParseUrlError::ProtocolInvalid);
    }
    let pathname = url.path();
    if pathname.is_empty() {
        return Err(ParseUrlError::PathnameMissing);
    }
    let recipient = Address::from_str(pathname).map_err(|_| ParseUrlError::RecipientInvalid)?;

    let params = QueryParams::new(url);

    let amount = params
        .first(AMOUNT_PARAM)
        .map(Amount::from_str)
        .transpose()?;

    let spl_token = params
        .first(SPL_TOKEN_PARAM)
        .map(Address::from_str)
        .transpose()
        .map_err(|_| ParseUrlError::SplTokenInvalid)?;

    let reference = params
        .all(REFERENCE_PARAM)
        .map(Address::from_str)
        .collect::<Result<Vec<_>, _>>()
        .map_err(|_| ParseUrlError::ReferenceInvalid)?;

    let mut builder = TransferRequest::builder(recipient).references(reference);
    if let Some(amount) = amount {
        builder = builder.amount(amount);
    }
    if let Some(mint) = spl_token {
        builder = builder.spl_token(mint);
    }
    if let Some(label) = params.first(LABEL_PARAM) {
        builder = builder.label(label);
    }
    if let Some(message) = params.first(MESSAGE_PARAM) {
        builder = builder.message(message);
    }
    if let Some(memo) = params.first(MEMO_PARAM) {
        builder = builder.memo(memo);
    }
    Ok(builder.build())
}

/// Decoded query pairs, kept in input order.
struct QueryParams<'a> {
    pairs: Vec<(Cow<'a, str>, Cow<'a, str>)>,
}

impl<'a> QueryParams<'a> {
    fn new(url: &'a Url) -> Self {
        Self {
            pairs: url.query_pairs().collect(),
        }
    }

    fn first(&self, key: &str) -> Option<&str> {
        self.all(key).next()
    }

    fn all<'s>(&'s self, key: &str) -> impl Iterator<Item = &'s str> {
        self.pairs
            .iter()
            .filter(move |(k, _)| k == key)
            .map(|(_, v)| &**v)
    }
}

impl FromStr for TransferRequest {
    type Err = ParseUrlError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_url(s)
    }
}

impl TryFrom<&Url> for TransferRequest {
    type Error = ParseUrlError;

    fn try_from(url: &Url) -> Result<Self, Self::Error> {
        from_url(url)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MERCHANT: &str = "36vqn1tAJrWC6DcxZtKp7wpTqtP6jhr2DDJJbjs6AUUY";
    const USDC: &str = "EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v";

    fn merchant() -> Address {
        MERCHANT.parse().unwrap()
    }

    fn full_request() -> TransferRequest {
        TransferRequest::builder(merchant())
            .amount("0.05".parse().unwrap())
            .spl_token(USDC.parse().unwrap())
            .reference(Address::new([1; 32]))
            .reference(Address::new([2; 32]))
            .label("SOL Transfer")
            .message("Transfer of 0.05 SOL requested")
            .memo("SOL#1")
            .build()
    }

    #[test]
    fn test_encode_recipient_only() {
        let request = TransferRequest::builder(merchant()).build();
        assert_eq!(encode(&request), format!("solana:{MERCHANT}"));
    }

    #[test]
    fn test_encode_parameter_order() {
        let uri = encode(&full_request());
        let r1 = Address::new([1; 32]);
        let r2 = Address::new([2; 32]);
        assert_eq!(
            uri,
            format!(
                "solana:{MERCHANT}?amount=0.05&spl-token={USDC}&reference={r1}&reference={r2}\
                 &label=SOL+Transfer&message=Transfer+of+0.05+SOL+requested&memo=SOL%231"
            )
        );
    }

    #[test]
    fn test_encode_zero_amount_is_kept() {
        let request = TransferRequest::builder(merchant())
            .amount(Amount::zero())
            .build();
        assert_eq!(encode(&request), format!("solana:{MERCHANT}?amount=0"));
    }

    #[test]
    fn test_encode_url_matches_display() {
        let request = full_request();
        assert_eq!(encode_url(&request).as_str(), request.to_string());
    }

    #[test]
    fn test_roundtrip_full_request() {
        let request = full_request();
        assert_eq!(parse_url(&encode(&request)).unwrap(), request);
    }

    #[test]
    fn test_roundtrip_minimal_requests() {
        let requests = [
            TransferRequest::builder(merchant()).build(),
            TransferRequest::builder(merchant())
                .amount(Amount::zero())
                .build(),
            TransferRequest::builder(merchant())
                .reference(Address::new([9; 32]))
                .build(),
            TransferRequest::builder(merchant())
                .spl_token(USDC.parse().unwrap())
                .build(),
        ];
        for request in requests {
            let uri = encode(&request);
            assert_eq!(parse_url(&uri).unwrap(), request, "{uri}");
        }
    }

    #[test]
    fn test_roundtrip_text_needing_escapes() {
        let request = TransferRequest::builder(merchant())
            .label("a&b=c")
            .message("100% #1 ?")
            .memo("x+y/z é")
            .build();
        let uri = encode(&request);
        assert_eq!(
            uri,
            format!(
                "solana:{MERCHANT}?label=a%26b%3Dc&message=100%25+%231+%3F&memo=x%2By%2Fz+%C3%A9"
            )
        );
        assert_eq!(parse_url(&uri).unwrap(), request);
    }

    #[test]
    fn test_roundtrip_unicode_text() {
        let request = TransferRequest::builder(merchant())
            .label("Café & Co")
            .message("50% off? yes=1")
            .build();
        assert_eq!(parse_url(&encode(&request)).unwrap(), request);
    }

    #[test]
    fn test_parse_amount_trailing_zeros() {
        let request = parse_url(&format!("solana:{MERCHANT}?amount=0.050000")).unwrap();
        assert_eq!(request.amount(), Some(&Amount::from_units(5, 2)));
        assert_eq!(
            encode(&request),
            format!("solana:{MERCHANT}?amount=0.05")
        );
    }

    #[test]
    fn test_parse_zero_amount_is_present() {
        let request = parse_url(&format!("solana:{MERCHANT}?amount=0")).unwrap();
        assert_eq!(request.amount(), Some(&Amount::zero()));
    }

    #[test]
    fn test_parse_too_long() {
        let uri = format!("solana:{MERCHANT}?memo={}", "a".repeat(MAX_URL_LENGTH));
        assert_eq!(parse_url(&uri), Err(ParseUrlError::LengthInvalid));
    }

    #[test]
    fn test_parse_exactly_max_length() {
        let prefix = format!("solana:{MERCHANT}?memo=");
        let uri = format!("{prefix}{}", "a".repeat(MAX_URL_LENGTH - prefix.len()));
        assert_eq!(uri.chars().count(), MAX_URL_LENGTH);
        let request = parse_url(&uri).unwrap();
        assert_eq!(request.memo().map(str::len), Some(MAX_URL_LENGTH - prefix.len()));
    }

    #[test]
    fn test_parse_length_counts_characters_not_bytes() {
        let prefix = format!("solana:{MERCHANT}?memo=");
        let fill = MAX_URL_LENGTH - prefix.len();

        let uri = format!("{prefix}{}", "é".repeat(fill));
        assert!(uri.len() > MAX_URL_LENGTH);
        assert_eq!(
            parse_url(&uri).unwrap().memo().map(|m| m.chars().count()),
            Some(fill)
        );

        let uri = format!("{prefix}{}", "é".repeat(fill + 1));
        assert_eq!(parse_url(&uri), Err(ParseUrlError::LengthInvalid));
    }

    #[test]
    fn test_parse_length_checked_before_protocol() {
        let uri = format!("http://{}", "a".repeat(MAX_URL_LENGTH));
        assert_eq!(parse_url(&uri), Err(ParseUrlError::LengthInvalid));
    }

    #[test]
    fn test_parse_not_a_url() {
        assert!(matches!(
            parse_url("no scheme here"),
            Err(ParseUrlError::UrlMalformed(_))
        ));
    }

    #[test]
    fn test_parse_wrong_protocol() {
        assert_eq!(parse_url("http://x"), Err(ParseUrlError::ProtocolInvalid));
        assert_eq!(
            parse_url(&format!("bitcoin:{MERCHANT}")),
            Err(ParseUrlError::ProtocolInvalid)
        );
    }

    #[test]
    fn test_parse_empty_path() {
        assert_eq!(parse_url("solana:"), Err(ParseUrlError::PathnameMissing));
        assert_eq!(
            parse_url("solana:?amount=1"),
            Err(ParseUrlError::PathnameMissing)
        );
    }

    #[test]
    fn test_parse_invalid_recipient() {
        assert_eq!(
            parse_url("solana:0OIl0OIl0OIl0OIl0OIl0OIl0OIl0OIl"),
            Err(ParseUrlError::RecipientInvalid)
        );
        assert_eq!(
            parse_url("solana:36vqn1tAJrWC6DcxZtKp7wpT"),
            Err(ParseUrlError::RecipientInvalid)
        );
    }

    #[test]
    fn test_parse_recipient_checked_before_amount() {
        assert_eq!(
            parse_url("solana:bad?amount=-1"),
            Err(ParseUrlError::RecipientInvalid)
        );
    }

    #[test]
    fn test_parse_negative_amount_fails_pattern() {
        assert_eq!(
            parse_url(&format!("solana:{MERCHANT}?amount=-1")),
            Err(ParseUrlError::AmountInvalid)
        );
    }

    #[test]
    fn test_parse_malformed_amounts() {
        for amount in ["1e9", "1.", ".1", "abc", "", "1,5"] {
            assert_eq!(
                parse_url(&format!("solana:{MERCHANT}?amount={amount}")),
                Err(ParseUrlError::AmountInvalid),
                "amount {amount:?}"
            );
        }
    }

    #[test]
    fn test_parse_high_precision_amounts_exactly() {
        for (text, encoded) in [
            ("0.10000000000000000000000000000", "0.1"),
            ("79228162514264337593543950336", "79228162514264337593543950336"),
            ("0.00000000000000000000000000001", "0.00000000000000000000000000001"),
        ] {
            let request = parse_url(&format!("solana:{MERCHANT}?amount={text}")).unwrap();
            assert_eq!(request.amount(), Some(&text.parse::<Amount>().unwrap()));
            assert_eq!(encode(&request), format!("solana:{MERCHANT}?amount={encoded}"));
        }
    }

    #[test]
    fn test_roundtrip_forty_digit_amount() {
        let amount = format!("{}.{}", "1".repeat(40), "7".repeat(40));
        let uri = format!("solana:{MERCHANT}?amount={amount}");
        let request = parse_url(&uri).unwrap();
        assert_eq!(request.amount().map(ToString::to_string), Some(amount));
        assert_eq!(encode(&request), uri);
    }

    #[test]
    fn test_amount_errors_map_to_kinds() {
        let err = Amount::new(bigdecimal::BigDecimal::from(-1)).unwrap_err();
        assert_eq!(ParseUrlError::from(err), ParseUrlError::AmountNegative);
        assert_eq!(
            ParseUrlError::from(AmountError::NotANumber("1".to_owned())),
            ParseUrlError::AmountNaN
        );
        assert_eq!(
            ParseUrlError::from(AmountError::Invalid("x".to_owned())),
            ParseUrlError::AmountInvalid
        );
    }

    #[test]
    fn test_parse_amount_checked_before_spl_token() {
        assert_eq!(
            parse_url(&format!("solana:{MERCHANT}?spl-token=bad&amount=x")),
            Err(ParseUrlError::AmountInvalid)
        );
    }

    #[test]
    fn test_parse_invalid_spl_token() {
        assert_eq!(
            parse_url(&format!("solana:{MERCHANT}?spl-token=not-a-key")),
            Err(ParseUrlError::SplTokenInvalid)
        );
    }

    #[test]
    fn test_parse_three_references_in_order() {
        let refs = [
            Address::new([5; 32]),
            Address::new([3; 32]),
            Address::new([4; 32]),
        ];
        let uri = format!(
            "solana:{MERCHANT}?reference={}&label=x&reference={}&reference={}",
            refs[0], refs[1], refs[2]
        );
        let request = parse_url(&uri).unwrap();
        assert_eq!(request.reference(), Some(&refs[..]));
    }

    #[test]
    fn test_parse_no_reference_is_none() {
        let request = parse_url(&format!("solana:{MERCHANT}?amount=1")).unwrap();
        assert_eq!(request.reference(), None);
    }

    #[test]
    fn test_parse_one_bad_reference_fails_all() {
        let good = Address::new([5; 32]);
        let uri = format!("solana:{MERCHANT}?reference={good}&reference=nope");
        assert_eq!(parse_url(&uri), Err(ParseUrlError::ReferenceInvalid));
    }

    #[test]
    fn test_parse_empty_text_fields_are_absent() {
        let request = parse_url(&format!("solana:{MERCHANT}?label=&message=&memo=")).unwrap();
        assert_eq!(request.label(), None);
        assert_eq!(request.message(), None);
        assert_eq!(request.memo(), None);
    }

    #[test]
    fn test_parse_ignores_unknown_params() {
        let request =
            parse_url(&format!("solana:{MERCHANT}?foo=bar&amount=2&x-extra=1")).unwrap();
        assert_eq!(request.amount(), Some(&Amount::from_units(2, 0)));
        assert_eq!(
            request,
            TransferRequest::builder(merchant())
                .amount(Amount::from_units(2, 0))
                .build()
        );
    }

    #[test]
    fn test_parse_uses_first_amount() {
        let request = parse_url(&format!("solana:{MERCHANT}?amount=1&amount=2")).unwrap();
        assert_eq!(request.amount(), Some(&Amount::from_units(1, 0)));
    }

    #[test]
    fn test_parse_decodes_text() {
        let request =
            parse_url(&format!("solana:{MERCHANT}?label=Mike%27s+Shop&memo=OR%231")).unwrap();
        assert_eq!(request.label(), Some("Mike's Shop"));
        assert_eq!(request.memo(), Some("OR#1"));
    }

    #[test]
    fn test_from_url_skips_length_check() {
        let uri = format!("solana:{MERCHANT}?memo={}", "a".repeat(MAX_URL_LENGTH));
        let url = Url::parse(&uri).unwrap();
        let request = TransferRequest::try_from(&url).unwrap();
        assert_eq!(request.memo().map(str::len), Some(MAX_URL_LENGTH));
    }

    #[test]
    fn test_from_str() {
        let request: TransferRequest = format!("solana:{MERCHANT}").parse().unwrap();
        assert_eq!(request.recipient(), merchant());
    }
}
