//! Tool routing for ragchat.
//!
//! A user message is matched against an ordered list of intents. The first
//! intent that matches invokes its tool, and the tool's output replaces the
//! message before it reaches the model.
//!
//! Built in: `sum_two_numbers` with English and Chinese addition phrasings.
//! Remote tools are declared in `[[tools.remote]]` and called over HTTP.

pub mod intent;
pub mod remote;
pub mod router;
pub mod sum;

pub use intent::{builtin_sum_intents, Extractor, ToolIntent};
pub use remote::RemoteTool;
pub use router::{RouteOutcome, ToolRouter};
pub use sum::{format_number, SumTool};
