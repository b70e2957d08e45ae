//! Registry of upstream operations.
//!
//! # Design
//! Every endpoint the API documents is one `Operation` row: verb, path
//! segments, query parameters and body shape. `Operation::descriptor` walks
//! the row, validates each argument on the way, and produces a
//! `RequestDescriptor` for the executor. Adding an endpoint is adding a row.
//!
//! Segment and parameter kinds decide validation: `Token`/`Wallet` go through
//! the address validator, required text must be non-empty, integers may carry
//! a default and a clamp (page sizes), and flags are only sent when set.

use serde_json::{json, Map, Value};

use crate::error::{Error, Result};
use crate::http::HttpMethod;
use crate::types::{Args, RequestDescriptor};
use crate::validate::{require, require_list, validate_token_address, validate_wallet_address};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Segment {
    Literal(&'static str),
    Token(&'static str),
    Wallet(&'static str),
    /// Required free-form segment, e.g. a pool address or page number.
    Text(&'static str),
    /// Trailing segment appended only when the argument is present.
    Optional(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    Token,
    Text { default: Option<&'static str> },
    Integer { default: Option<i64>, max: Option<i64> },
    /// Sent as `"true"` only when the argument is true.
    Flag,
    /// Always sent as `"true"`/`"false"`.
    Bool { default: bool },
    /// Token addresses, comma-joined.
    TokenList,
    /// Optional unix timestamp; zero counts as absent.
    Timestamp,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QueryParam {
    /// Argument name callers use.
    pub arg: &'static str,
    /// Parameter name on the wire.
    pub wire: &'static str,
    pub kind: QueryKind,
    pub required: bool,
}

impl QueryParam {
    const fn new(arg: &'static str, kind: QueryKind, required: bool) -> Self {
        Self {
            arg,
            wire: arg,
            kind,
            required,
        }
    }

    const fn token(arg: &'static str) -> Self {
        Self::new(arg, QueryKind::Token, true)
    }

    const fn int(arg: &'static str, default: i64) -> Self {
        Self::new(
            arg,
            QueryKind::Integer {
                default: Some(default),
                max: None,
            },
            false,
        )
    }

    const fn required_int(arg: &'static str) -> Self {
        Self::new(
            arg,
            QueryKind::Integer {
                default: None,
                max: None,
            },
            true,
        )
    }

    const fn timestamp(arg: &'static str) -> Self {
        Self::new(arg, QueryKind::Timestamp, false)
    }

    const fn clamped(arg: &'static str, default: i64, max: i64) -> Self {
        Self::new(
            arg,
            QueryKind::Integer {
                default: Some(default),
                max: Some(max),
            },
            false,
        )
    }

    const fn on_wire(mut self, wire: &'static str) -> Self {
        self.wire = wire;
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Body {
    None,
    /// `{"<arg>": [token, ...]}`; the list must be non-empty.
    TokenList(&'static str),
    /// The argument value is sent as the body verbatim.
    Raw(&'static str),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Operation {
    pub name: &'static str,
    pub method: HttpMethod,
    pub path: &'static [Segment],
    pub query: &'static [QueryParam],
    pub body: Body,
}

impl Operation {
    const fn get(name: &'static str, path: &'static [Segment]) -> Self {
        Self {
            name,
            method: HttpMethod::Get,
            path,
            query: &[],
            body: Body::None,
        }
    }

    const fn post(name: &'static str, path: &'static [Segment], body: Body) -> Self {
        Self {
            name,
            method: HttpMethod::Post,
            path,
            query: &[],
            body,
        }
    }

    const fn with_query(mut self, query: &'static [QueryParam]) -> Self {
        self.query = query;
        self
    }

    fn accepts(&self, arg: &str) -> bool {
        let in_path = self.path.iter().any(|segment| match segment {
            Segment::Literal(_) => false,
            Segment::Token(name)
            | Segment::Wallet(name)
            | Segment::Text(name)
            | Segment::Optional(name) => *name == arg,
        });
        let in_body = match self.body {
            Body::None => false,
            Body::TokenList(name) | Body::Raw(name) => name == arg,
        };
        in_path || in_body || self.query.iter().any(|q| q.arg == arg)
    }

    /// Validate `args` and build the request for this operation.
    pub fn descriptor(&self, args: &Args) -> Result<RequestDescriptor> {
        if let Some(unknown) = args.names().find(|name| !self.accepts(name)) {
            return Err(Error::Validation(format!(
                "{} does not take argument {unknown}",
                self.name
            )));
        }

        let mut path = String::new();
        for segment in self.path {
            let part = match *segment {
                Segment::Literal(text) => text.to_owned(),
                Segment::Token(arg) => validate_token_address(required_str(args, arg)?)?.to_owned(),
                Segment::Wallet(arg) => validate_wallet_address(required_str(args, arg)?)?.to_owned(),
                Segment::Text(arg) => match args.get(arg) {
                    Some(value) => path_text(arg, value)?,
                    None => return Err(missing(arg)),
                },
                Segment::Optional(arg) => match args.get(arg) {
                    Some(value) => path_text(arg, value)?,
                    None => continue,
                },
            };
            path.push('/');
            path.push_str(&part);
        }

        let mut descriptor = match self.body {
            Body::None => RequestDescriptor::get(path),
            Body::TokenList(arg) => {
                let tokens = token_list(args, arg)?;
                require_list(arg, &tokens)?;
                let mut body = Map::new();
                body.insert(arg.to_owned(), json!(tokens));
                RequestDescriptor::post(path, Value::Object(body))
            }
            Body::Raw(arg) => match args.get(arg) {
                Some(value) => RequestDescriptor::post(path, value.clone()),
                None => return Err(missing(arg)),
            },
        };
        descriptor.method = self.method;

        for param in self.query {
            if let Some(value) = query_value(param, args)? {
                descriptor.query.push((param.wire.to_owned(), value));
            }
        }
        Ok(descriptor)
    }
}

fn missing(arg: &str) -> Error {
    Error::Validation(format!("{arg} is required"))
}

fn required_str<'a>(args: &'a Args, arg: &str) -> Result<&'a str> {
    match args.get(arg) {
        Some(Value::String(s)) => Ok(s),
        Some(_) => Err(Error::Validation(format!("{arg} must be a string"))),
        None => Err(missing(arg)),
    }
}

fn path_text(arg: &str, value: &Value) -> Result<String> {
    let text = match value {
        Value::String(s) => require(arg, s)?.to_owned(),
        Value::Number(n) => n.to_string(),
        _ => return Err(Error::Validation(format!("{arg} must be a string or number"))),
    };
    if text.contains(['/', '?', '#']) {
        return Err(Error::Validation(format!(
            "{arg} must be a single path segment"
        )));
    }
    Ok(text)
}

fn token_list(args: &Args, arg: &str) -> Result<Vec<String>> {
    let Some(value) = args.get(arg) else {
        return Ok(Vec::new());
    };
    let items = value
        .as_array()
        .ok_or_else(|| Error::Validation(format!("{arg} must be a list of addresses")))?;
    items
        .iter()
        .map(|item| {
            let token = item
                .as_str()
                .ok_or_else(|| Error::Validation(format!("{arg} must be a list of addresses")))?;
            validate_token_address(token).map(str::to_owned)
        })
        .collect()
}

fn query_value(param: &QueryParam, args: &Args) -> Result<Option<String>> {
    let value = args.get(param.arg);
    if value.is_none() && param.required {
        return Err(missing(param.arg));
    }

    match param.kind {
        QueryKind::Token => match value {
            Some(_) => Ok(Some(
                validate_token_address(required_str(args, param.arg)?)?.to_owned(),
            )),
            None => Ok(None),
        },
        QueryKind::Text { default } => match value {
            Some(Value::String(s)) => Ok(Some(require(param.arg, s)?.to_owned())),
            Some(_) => Err(Error::Validation(format!("{} must be a string", param.arg))),
            None => Ok(default.map(str::to_owned)),
        },
        QueryKind::Integer { default, max } => {
            let n = match value {
                Some(v) => Some(v.as_i64().ok_or_else(|| {
                    Error::Validation(format!("{} must be an integer", param.arg))
                })?),
                None => default,
            };
            Ok(n.map(|n| max.map_or(n, |max| n.min(max)).to_string()))
        }
        QueryKind::Timestamp => match value {
            Some(v) => match v.as_i64() {
                Some(0) => Ok(None),
                Some(n) => Ok(Some(n.to_string())),
                None => Err(Error::Validation(format!("{} must be an integer", param.arg))),
            },
            None => Ok(None),
        },
        QueryKind::Flag => match value {
            Some(Value::Bool(true)) => Ok(Some("true".to_owned())),
            Some(Value::Bool(false)) | None => Ok(None),
            Some(_) => Err(Error::Validation(format!("{} must be a boolean", param.arg))),
        },
        QueryKind::Bool { default } => match value {
            Some(Value::Bool(b)) => Ok(Some(b.to_string())),
            Some(_) => Err(Error::Validation(format!("{} must be a boolean", param.arg))),
            None => Ok(Some(default.to_string())),
        },
        QueryKind::TokenList => {
            let tokens = token_list(args, param.arg)?;
            if tokens.is_empty() {
                if param.required {
                    require_list(param.arg, &tokens)?;
                }
                return Ok(None);
            }
            Ok(Some(tokens.join(",")))
        }
    }
}

use Segment::{Literal as L, Optional, Text, Token, Wallet};

const PAGED_LARGE: &[QueryParam] = &[QueryParam::int("page", 1), QueryParam::clamped("limit", 250, 500)];
const PAGED_SMALL: &[QueryParam] = &[QueryParam::int("page", 1), QueryParam::int("limit", 100)];
const SEARCH: &[QueryParam] = &[
    QueryParam::new("query", QueryKind::Text { default: None }, true),
    QueryParam::int("limit", 10),
];
const TOKENS_REQUIRED: &[QueryParam] = &[QueryParam::new("tokens", QueryKind::TokenList, true)];
const TOKENS_OPTIONAL: &[QueryParam] = &[QueryParam::new("tokens", QueryKind::TokenList, false)];
const PRICE: &[QueryParam] = &[
    QueryParam::token("token"),
    QueryParam::new("price_changes", QueryKind::Flag, false).on_wire("priceChanges"),
];
const PRICE_AT: &[QueryParam] = &[QueryParam::token("token"), QueryParam::required_int("timestamp")];
const CHART: &[QueryParam] = &[
    QueryParam::new("interval", QueryKind::Text { default: Some("1h") }, false).on_wire("type"),
    QueryParam::timestamp("time_from"),
    QueryParam::timestamp("time_to"),
    QueryParam::new("market_cap", QueryKind::Bool { default: false }, false).on_wire("marketCap"),
    QueryParam::new("remove_outliers", QueryKind::Bool { default: true }, false)
        .on_wire("removeOutliers"),
];
const FIRST_BUYERS: &[QueryParam] = &[QueryParam::int("limit", 100)];
const PRICE_WINDOW: &[QueryParam] = &[
    QueryParam::token("token"),
    QueryParam::required_int("time_from"),
    QueryParam::required_int("time_to"),
];

/// Every operation the upstream API documents.
pub static OPERATIONS: &[Operation] = &[
    // tokens
    Operation::get("get_token_info", &[L("tokens"), Token("token")]),
    Operation::get("get_tokens_by_pool", &[L("tokens"), L("by-pool"), Text("pool")]),
    Operation::get("get_token_holders", &[L("tokens"), Token("token"), L("holders")])
        .with_query(PAGED_LARGE),
    Operation::get(
        "get_token_holders_top",
        &[L("tokens"), Token("token"), L("holders"), L("top")],
    ),
    Operation::get("get_token_ath", &[L("tokens"), Token("token"), L("ath")]),
    Operation::get("get_deployer_tokens", &[L("deployer"), Wallet("wallet")]).with_query(PAGED_LARGE),
    Operation::get("search_tokens", &[L("search")]).with_query(SEARCH),
    Operation::get("get_latest_tokens", &[L("tokens"), L("latest")]).with_query(PAGED_LARGE),
    Operation::get("get_tokens_multi", &[L("tokens"), L("multi")])
        .with_query(TOKENS_REQUIRED),
    Operation::post("post_tokens_multi", &[L("tokens"), L("multi")], Body::TokenList("tokens")),
    Operation::get("get_trending_tokens", &[L("tokens"), L("trending"), Optional("timeframe")]),
    Operation::get("get_tokens_by_volume", &[L("tokens"), L("volume"), Optional("timeframe")]),
    Operation::get("get_tokens_multi_all", &[L("tokens"), L("multi"), L("all")]),
    Operation::get("get_tokens_multi_graduated", &[L("tokens"), L("multi"), L("graduated")]),
    // prices
    Operation::get("get_token_price", &[L("price")]).with_query(PRICE),
    Operation::get("get_price_history", &[L("price"), L("history")]).with_query(PRICE_WINDOW),
    Operation::get("get_price_at_timestamp", &[L("price"), L("history"), L("timestamp")])
        .with_query(PRICE_AT),
    Operation::get("get_price_range", &[L("price"), L("history"), L("range")])
        .with_query(PRICE_WINDOW),
    Operation::post("post_token_price", &[L("price")], Body::Raw("price_data")),
    Operation::get("get_multiple_token_prices", &[L("price"), L("multi")])
        .with_query(TOKENS_OPTIONAL),
    Operation::post("post_multiple_token_prices", &[L("price"), L("multi")], Body::TokenList("tokens")),
    // wallets
    Operation::get("get_wallet_tokens", &[L("wallet"), Wallet("owner")]),
    Operation::get("get_wallet_basic", &[L("wallet"), Wallet("owner"), L("basic")]),
    Operation::get("get_wallet_page", &[L("wallet"), Wallet("owner"), L("page"), Text("page")]),
    Operation::get("get_wallet_trades", &[L("wallet"), Wallet("owner"), L("trades")])
        .with_query(PAGED_SMALL),
    Operation::get("get_wallet_chart", &[L("wallet"), Wallet("owner"), L("chart")]),
    // trades
    Operation::get("get_pool_trades", &[L("trades"), Token("token"), Text("pool")])
        .with_query(PAGED_SMALL),
    Operation::get(
        "get_wallet_token_trades",
        &[L("trades"), Token("token"), Text("pool"), Wallet("owner")],
    ),
    Operation::get(
        "get_token_wallet_trades",
        &[L("trades"), Token("token"), L("by-wallet"), Wallet("owner")],
    ),
    // charts
    Operation::get("get_chart_data", &[L("chart"), Token("token"), Optional("pool")])
        .with_query(CHART),
    Operation::get("get_holders_chart", &[L("holders"), L("chart"), Token("token")]),
    Operation::get("get_token_holders_chart", &[L("chart"), L("holders"), Token("token")]),
    // pnl
    Operation::get("get_wallet_pnl", &[L("pnl"), Wallet("wallet")]),
    Operation::get("get_first_buyers", &[L("first-buyers"), Token("token")])
        .with_query(FIRST_BUYERS),
    Operation::get("get_wallet_token_pnl", &[L("pnl"), Wallet("wallet"), Token("token")]),
    // top traders
    Operation::get("get_top_traders_all", &[L("top-traders"), L("all"), Optional("page")]),
    Operation::get("get_top_traders_token", &[L("top-traders"), Token("token")]),
    // stats and events
    Operation::get("get_token_stats", &[L("stats"), Token("token"), Optional("pool")]),
    Operation::get("get_live_events", &[L("live-events")]),
    Operation::get("get_token_events", &[L("events"), Token("token")]),
    Operation::get("get_pool_events", &[L("events"), Token("token"), Text("pool")]),
    // account
    Operation::get("get_credits", &[L("credits")]),
];

pub fn find(name: &str) -> Result<&'static Operation> {
    OPERATIONS
        .iter()
        .find(|op| op.name == name)
        .ok_or_else(|| Error::EndpointNotFound(name.to_owned()))
}

/// Sorted operation names.
pub fn names() -> Vec<&'static str> {
    let mut names: Vec<_> = OPERATIONS.iter().map(|op| op.name).collect();
    names.sort_unstable();
    names
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    const TOKEN: &str = "So11111111111111111111111111111111111111112";
    const WALLET: &str = "9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM";
    const POOL: &str = "58oQChx4yWmvKdwLLZzBi4ChoCc2fqCUWBkwMihLYQo2";

    fn query_of(d: &RequestDescriptor) -> Vec<(&str, &str)> {
        d.query.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect()
    }

    #[test]
    fn names_are_unique_and_sorted() {
        let names = names();
        let unique: HashSet<_> = names.iter().collect();
        assert_eq!(unique.len(), OPERATIONS.len());
        assert!(names.windows(2).all(|w| w[0] < w[1]));
        assert!(names.contains(&"get_credits"));
    }

    #[test]
    fn unknown_operation_is_endpoint_not_found() {
        let err = find("get_everything").unwrap_err();
        assert!(matches!(err, Error::EndpointNotFound(_)));
    }

    #[test]
    fn token_path_is_validated() {
        let op = find("get_token_info").unwrap();
        let d = op.descriptor(&Args::new().with("token", TOKEN)).unwrap();
        assert_eq!(d.method, HttpMethod::Get);
        assert_eq!(d.path, format!("/tokens/{TOKEN}"));

        let err = op.descriptor(&Args::new().with("token", "short")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));

        let err = op.descriptor(&Args::new()).unwrap_err();
        assert!(err.to_string().contains("token is required"));

        let err = op.descriptor(&Args::new().with("token", 42)).unwrap_err();
        assert!(err.to_string().contains("must be a string"));
    }

    #[test]
    fn holders_limit_is_clamped_and_defaulted() {
        let op = find("get_token_holders").unwrap();
        let d = op
            .descriptor(&Args::new().with("token", TOKEN).with("limit", 9000))
            .unwrap();
        assert_eq!(query_of(&d), vec![("page", "1"), ("limit", "500")]);

        let d = op.descriptor(&Args::new().with("token", TOKEN)).unwrap();
        assert_eq!(query_of(&d), vec![("page", "1"), ("limit", "250")]);
    }

    #[test]
    fn wallet_trades_limit_is_not_clamped() {
        let op = find("get_wallet_trades").unwrap();
        let d = op
            .descriptor(&Args::new().with("owner", WALLET).with("limit", 1000).with("page", 3))
            .unwrap();
        assert_eq!(d.path, format!("/wallet/{WALLET}/trades"));
        assert_eq!(query_of(&d), vec![("page", "3"), ("limit", "1000")]);
    }

    #[test]
    fn optional_trailing_segment() {
        let op = find("get_trending_tokens").unwrap();
        assert_eq!(op.descriptor(&Args::new()).unwrap().path, "/tokens/trending");
        let d = op.descriptor(&Args::new().with("timeframe", "1h")).unwrap();
        assert_eq!(d.path, "/tokens/trending/1h");

        let op = find("get_top_traders_all").unwrap();
        let d = op.descriptor(&Args::new().with("page", 2)).unwrap();
        assert_eq!(d.path, "/top-traders/all/2");
    }

    #[test]
    fn path_text_cannot_escape_its_segment() {
        let op = find("get_tokens_by_pool").unwrap();
        let err = op
            .descriptor(&Args::new().with("pool", "../credits"))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = op.descriptor(&Args::new().with("pool", "")).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn search_requires_query() {
        let op = find("search_tokens").unwrap();
        assert!(matches!(
            op.descriptor(&Args::new()),
            Err(Error::Validation(_))
        ));
        let d = op.descriptor(&Args::new().with("query", "bonk")).unwrap();
        assert_eq!(query_of(&d), vec![("query", "bonk"), ("limit", "10")]);
    }

    #[test]
    fn price_flag_only_sent_when_true() {
        let op = find("get_token_price").unwrap();
        let d = op.descriptor(&Args::new().with("token", TOKEN)).unwrap();
        assert_eq!(query_of(&d), vec![("token", TOKEN)]);

        let d = op
            .descriptor(&Args::new().with("token", TOKEN).with("price_changes", true))
            .unwrap();
        assert_eq!(query_of(&d), vec![("token", TOKEN), ("priceChanges", "true")]);
    }

    #[test]
    fn chart_defaults_and_pool() {
        let op = find("get_chart_data").unwrap();
        let d = op
            .descriptor(&Args::new().with("token", TOKEN).with("pool", POOL).with("time_from", 1700000000))
            .unwrap();
        assert_eq!(d.path, format!("/chart/{TOKEN}/{POOL}"));
        assert_eq!(
            query_of(&d),
            vec![
                ("type", "1h"),
                ("time_from", "1700000000"),
                ("marketCap", "false"),
                ("removeOutliers", "true"),
            ]
        );
    }

    #[test]
    fn chart_zero_timestamps_are_omitted() {
        let op = find("get_chart_data").unwrap();
        let d = op
            .descriptor(&Args::new().with("token", TOKEN).with("time_from", 0).with("time_to", 0))
            .unwrap();
        assert_eq!(
            query_of(&d),
            vec![("type", "1h"), ("marketCap", "false"), ("removeOutliers", "true")]
        );

        let err = op
            .descriptor(&Args::new().with("token", TOKEN).with("time_to", "later"))
            .unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn post_token_list_body() {
        let op = find("post_tokens_multi").unwrap();
        let d = op
            .descriptor(&Args::new().with("tokens", vec![TOKEN, POOL]))
            .unwrap();
        assert_eq!(d.method, HttpMethod::Post);
        assert_eq!(d.path, "/tokens/multi");
        assert_eq!(d.body, Some(json!({ "tokens": [TOKEN, POOL] })));

        let empty: Vec<String> = Vec::new();
        let err = op.descriptor(&Args::new().with("tokens", empty)).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
        let err = op.descriptor(&Args::new()).unwrap_err();
        assert!(matches!(err, Error::Validation(_)));
    }

    #[test]
    fn get_token_list_is_comma_joined() {
        let op = find("get_tokens_multi").unwrap();
        let d = op
            .descriptor(&Args::new().with("tokens", vec![TOKEN, POOL]))
            .unwrap();
        assert_eq!(query_of(&d), vec![("tokens", format!("{TOKEN},{POOL}").as_str())]);

        let op = find("get_multiple_token_prices").unwrap();
        assert!(op.descriptor(&Args::new()).unwrap().query.is_empty());
    }

    #[test]
    fn raw_body_is_forwarded() {
        let op = find("post_token_price").unwrap();
        let body = json!({ "token": TOKEN, "price": 1.5 });
        let d = op
            .descriptor(&Args::new().with("price_data", body.clone()))
            .unwrap();
        assert_eq!(d.body, Some(body));
    }

    #[test]
    fn unknown_argument_is_rejected() {
        let op = find("get_credits").unwrap();
        let err = op.descriptor(&Args::new().with("tokne", TOKEN)).unwrap_err();
        assert!(err.to_string().contains("tokne"));
    }

    #[test]
    fn wallet_token_pnl_validates_both_addresses() {
        let op = find("get_wallet_token_pnl").unwrap();
        let d = op
            .descriptor(&Args::new().with("wallet", WALLET).with("token", TOKEN))
            .unwrap();
        assert_eq!(d.path, format!("/pnl/{WALLET}/{TOKEN}"));

        let err = op
            .descriptor(&Args::new().with("wallet", "x").with("token", TOKEN))
            .unwrap_err();
        assert!(err.to_string().contains("wallet"));
    }
}
