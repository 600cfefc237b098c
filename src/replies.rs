//! User-facing texts. The wording is what existing users see, keep it stable.

use crate::relay::RelayStage;
use crate::resolver::ResolvedFile;

pub const PROCESSING: &str = "🔄 Processing your link...";
pub const STARTING_RELAY: &str = "📥 Starting download and upload to channel...";

pub const UPLOAD_SUCCEEDED: &str = "✅ File has been uploaded to the channel successfully!";
pub const UPLOAD_FAILED: &str = "❌ Failed to upload file to the channel. Please try again later.";
pub const DOWNLOAD_FAILED: &str =
    "❌ Failed to download the file from the host. Please try again later.";

fn domain_list(domains: &[String]) -> String {
    domains
        .iter()
        .map(|d| format!("- {d}"))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn welcome(domains: &[String]) -> String {
    format!(
        "Welcome! 👋\n\n\
         I can help you generate direct download links from Terabox links.\n\
         Just send me a Terabox link and I'll convert it for you.\n\n\
         Supported domains:\n{}",
        domain_list(domains)
    )
}

pub fn rejection(domains: &[String]) -> String {
    format!(
        "❌ Please send a valid Terabox link from supported domains:\n{}",
        domain_list(domains)
    )
}

pub fn resolve_error(error: &str) -> String {
    format!("❌ Error: {error}\n\nPlease try again later.")
}

pub fn final_report(
    file: &ResolvedFile,
    player_url: &str,
    relayed: Result<(), RelayStage>,
) -> String {
    let mut text = format!(
        "✅ Successfully processed!\n\n\
         📁 File: {}\n\
         📦 Size: {}\n\n\
         🔗 Direct Download Link:\n{}\n\n\
         🎥 Watch Online:\n{}\n\n",
        file.title, file.size, file.direct_link, player_url
    );

    text.push_str(match relayed {
        Ok(()) => UPLOAD_SUCCEEDED,
        Err(RelayStage::Download) => DOWNLOAD_FAILED,
        Err(RelayStage::Upload) => UPLOAD_FAILED,
    });
    text
}
