#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Core types for x402 v2 payments settled on Aptos.
//!
//! This crate provides the wire-level vocabulary shared by every party of an
//! HTTP 402 Payment Required flow: the resource server that asks for payment,
//! the client that pays, and the facilitator that verifies and settles.
//!
//! # Overview
//!
//! When a client requests a paid resource without proof of payment, the server
//! answers `402` with a base64-encoded [`proto::v2::PaymentRequired`] challenge
//! in the `Payment-Required` header. The client signs an Aptos transaction and
//! retries with a [`scheme::aptos_exact::PaymentPayload`] in the
//! `Payment-Signature` header. Once the facilitator settles the transaction the
//! server answers with a [`proto::SettlementReceipt`] in the `Payment-Response`
//! header.
//!
//! # Modules
//!
//! - [`chain`] - CAIP-2 chain identifiers
//! - [`codec`] - Base64-over-JSON header encoding for challenges, payloads and receipts
//! - [`networks`] - Well-known Aptos networks and token deployments
//! - [`proto`] - Wire format types (verify/settle results, receipts, v2 envelopes)
//! - [`scheme`] - Concrete types of the Aptos `exact` payment scheme
//! - [`util`] - Helper types (base64, string literals, money amounts)

pub mod chain;
pub mod codec;
pub mod networks;
pub mod proto;
pub mod scheme;
pub mod util;
