//! Workout step video embeds.
//!
//! Each platform renders a step video differently. The renderer is chosen
//! once through [`embed_for`] instead of branching on the platform at every
//! call site.

use crate::WorkoutStep;

/// Where a step is being presented
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Platform {
    Web,
    Native,
    Terminal,
}

pub trait MediaEmbed: Send + Sync {
    fn render(&self, url: &str) -> String;
}

/// Inline frame markup for browsers
#[derive(Clone, Copy, Debug, Default)]
pub struct WebFrameEmbed;

impl MediaEmbed for WebFrameEmbed {
    fn render(&self, url: &str) -> String {
        format!(
            r#"<iframe src="{}" title="Workout Video" style="width:100%;height:220px;border:none" allowfullscreen></iframe>"#,
            escape_attr(url)
        )
    }
}

/// Source descriptor handed to a native web view
#[derive(Clone, Copy, Debug, Default)]
pub struct NativeViewEmbed;

impl MediaEmbed for NativeViewEmbed {
    fn render(&self, url: &str) -> String {
        format!("webview:{}", url)
    }
}

/// A plain link for terminals
#[derive(Clone, Copy, Debug, Default)]
pub struct TerminalEmbed;

impl MediaEmbed for TerminalEmbed {
    fn render(&self, url: &str) -> String {
        format!("Video: {}", url)
    }
}

pub fn embed_for(platform: Platform) -> Box<dyn MediaEmbed> {
    match platform {
        Platform::Web => Box::new(WebFrameEmbed),
        Platform::Native => Box::new(NativeViewEmbed),
        Platform::Terminal => Box::new(TerminalEmbed),
    }
}

pub const NO_VIDEO: &str = "No video available for this step.";

/// Render a step's video, or the placeholder when it has no usable URL
pub fn render_step_video(step: &WorkoutStep, embed: &dyn MediaEmbed) -> String {
    match step.video_url.as_deref().map(str::trim) {
        Some(url) if url.starts_with("http://") || url.starts_with("https://") => embed.render(url),
        _ => NO_VIDEO.to_string(),
    }
}

fn escape_attr(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('"', "&quot;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}
