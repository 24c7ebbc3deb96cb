//! Binance spot trade stream.
//!
//! One WebSocket connection carries `<symbol>@trade` for every configured
//! symbol. [`build_conn_config`] turns the relay config into the generic
//! [`WsConnConfig`] the reconnecting client runs with.

pub mod json_parser;

use relay_core::config::AppConfig;
use relay_core::ws::{ReconnectPolicy, WsConnConfig};

/// Build the upstream connection config from the application config.
pub fn build_conn_config(config: &AppConfig) -> WsConnConfig {
    let upstream = &config.upstream;
    let symbols = config.effective_symbols();

    WsConnConfig {
        url: upstream.effective_url(),
        subscribe_msg: Some(json_parser::build_subscribe(
            &symbols,
            &upstream.effective_channel(),
            upstream.effective_request_id(),
        )),
        extra_headers: upstream.extra_headers.clone().unwrap_or_default(),
        reconnect: ReconnectPolicy {
            base_delay: upstream.reconnect_delay(),
            max_delay: upstream.max_reconnect_delay(),
        },
        decode_error_policy: upstream.effective_decode_policy(),
        label: "upstream".into(),
    }
}
