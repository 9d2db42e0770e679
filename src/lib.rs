//! A fortune teller that charges per fortune, over [x402](https://www.x402.org) v2 on Aptos.
//!
//! The payment flow lives in [`x402_paygate`]; this crate supplies the
//! resource ([`fortune::FortuneTeller`]), the HTTP surface ([`handlers`]) and
//! the process plumbing ([`config`], [`run`], [`util`]).

pub mod config;
pub mod fortune;
pub mod handlers;
pub mod run;
pub mod util;
