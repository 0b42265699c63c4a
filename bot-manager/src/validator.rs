//! Request validation: shared secret and caller origin.
//!
//! Webhook calls must originate from Telegram's published source range
//! (`149.154.167.197`..=`149.154.167.233`) or from one of the configured `valid_ips`
//! (single addresses or CIDR ranges).

use std::net::{IpAddr, Ipv4Addr};

use ipnet::IpNet;
use manager_core::{ManagerError, Result};
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

use crate::params::ParamSet;
use crate::request::RequestContext;

/// Lowest address of Telegram's webhook source range.
pub const TELEGRAM_IP_LOWER: Ipv4Addr = Ipv4Addr::new(149, 154, 167, 197);
/// Highest address of Telegram's webhook source range.
pub const TELEGRAM_IP_UPPER: Ipv4Addr = Ipv4Addr::new(149, 154, 167, 233);

/// Checks one invocation's secret and origin against the bot parameters.
pub struct RequestValidator<'a> {
    params: &'a ParamSet,
    request: &'a RequestContext,
}

impl<'a> RequestValidator<'a> {
    pub fn new(params: &'a ParamSet, request: &'a RequestContext) -> Self {
        Self { params, request }
    }

    /// Compares the transport secret (`s`) with the configured secret. Skipped for command-line
    /// runs unless `force` is set. Fails with [`ManagerError::InvalidAccess`] when either side is
    /// absent or they differ.
    pub fn validate_secret(&self, force: bool) -> Result<()> {
        if self.request.is_cli() && !force {
            return Ok(());
        }

        let expected = self.params.bot().secret.as_deref();
        let given = self.params.script_param("s");
        match (expected, given) {
            (Some(expected), Some(given))
                if bool::from(expected.as_bytes().ct_eq(given.as_bytes())) =>
            {
                Ok(())
            }
            _ => {
                warn!("step: secret validation failed");
                Err(ManagerError::InvalidAccess)
            }
        }
    }

    /// True for command-line runs, when `validate_request` is off, or when the caller address is
    /// in Telegram's range or one of the configured `valid_ips`.
    pub fn is_valid_request(&self) -> bool {
        if self.request.is_cli() || !self.params.bot().validate_request {
            return true;
        }

        let Some(ip) = caller_ip(self.request) else {
            debug!("step: no caller address available");
            return false;
        };

        let valid = is_telegram_ip(ip) || is_trusted_ip(ip, &self.params.bot().valid_ips);
        debug!(ip = %ip, valid, "step: request origin checked");
        valid
    }

    /// [`RequestValidator::is_valid_request`], failing with [`ManagerError::InvalidAccess`].
    pub fn validate_request(&self) -> Result<()> {
        if self.is_valid_request() {
            Ok(())
        } else {
            warn!("step: request origin rejected");
            Err(ManagerError::InvalidAccess)
        }
    }
}

/// Caller address: `X-Forwarded-For` (first entry), then `Client-IP`, then the peer address.
/// The first value that parses as an IP wins.
pub fn caller_ip(request: &RequestContext) -> Option<IpAddr> {
    let forwarded = request
        .forwarded_for()
        .and_then(|v| v.split(',').next())
        .and_then(parse_ip);
    forwarded
        .or_else(|| request.client_ip().and_then(parse_ip))
        .or(request.remote_addr())
}

fn parse_ip(raw: &str) -> Option<IpAddr> {
    raw.trim().parse().ok()
}

/// Whether `ip` lies in Telegram's webhook source range (closed interval).
pub fn is_telegram_ip(ip: IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => (TELEGRAM_IP_LOWER..=TELEGRAM_IP_UPPER).contains(&v4),
        IpAddr::V6(v6) => v6
            .to_ipv4_mapped()
            .is_some_and(|v4| (TELEGRAM_IP_LOWER..=TELEGRAM_IP_UPPER).contains(&v4)),
    }
}

/// Whether `ip` equals or is contained in one of `trusted` (addresses or CIDR ranges).
/// Unparseable entries are ignored.
pub fn is_trusted_ip(ip: IpAddr, trusted: &[String]) -> bool {
    trusted.iter().any(|entry| {
        let entry = entry.trim();
        if let Ok(net) = entry.parse::<IpNet>() {
            net.contains(&ip)
        } else if let Ok(addr) = entry.parse::<IpAddr>() {
            addr == ip
        } else {
            warn!(entry = %entry, "step: ignoring invalid trusted address");
            false
        }
    })
}
