//! Decoders for the `output` of a completed job.
//!
//! Deployments return one of two formats and nothing in the job tells them
//! apart, so the caller picks: [`report`] for the tab-separated tool report,
//! [`analysis`] for the XML analysis tree.

pub mod analysis;
pub mod report;
mod xml;

pub use analysis::IdentifyResult;
pub use report::{Attributes, ToolEntry, ToolReport};
pub use xml::Element;
