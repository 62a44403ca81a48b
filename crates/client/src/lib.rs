//! Blocking REST client for the survey vendor: response exports (as an
//! [`qs_export::ExportRemote`]), library messages, and scheduled SMS and
//! email distributions.

pub mod client;
pub mod distribution;

pub use client::{api_error, QualtricsClient};
pub use distribution::{
    email_request, random_tag, sms_request, tagged_message, DistributionReceipt,
    EmailDistributionRequest, Recipients, SmsDistributionRequest,
};
