//! courier - contact-list mailer with duplicate-send detection
//!
//! This crate is the sending core behind the courier browser extension:
//! it sends a message to a saved contact list through the Gmail API,
//! first checking whether a qualifying message was already exchanged with
//! that list today, and offers a threaded reply instead of a duplicate
//! send.

pub mod config;
pub mod domain;
pub mod providers;
pub mod services;
pub mod storage;
