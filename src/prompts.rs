//! Prompts for LLM-based concept-card generation.
//!
//! Callers can override the system prompt via
//! [`crate::config::StudioConfig::system_prompt`]; the constant here is used
//! only when no override is provided. The user message is always built by
//! [`card_request`] because it carries the styles and the source text.

use crate::config::{CanvasSpec, CardStyle};

/// Default system prompt: a four-stage concept-card design procedure.
pub const CARD_DESIGNER_PROMPT: &str = r#"You are a professional designer of concept cards that summarise an article at a glance. Follow this four-stage process for every card.

1. CONTENT ANALYSIS
   - Extract the core content: title, subtitle, central idea
   - Identify 3-5 main supporting points
   - Pick 1-2 key quotations
   - Judge the content density and choose a presentation strategy

2. STRUCTURE
   - Fixed size: {width}px × {height}px
   - Safe area: {safe_width}px × {safe_height}px (30px margin on every side)
   - 4-6 fixed content blocks laid out on a grid so everything aligns

3. FILL AND STYLE
   - Fill progressively, most important content first
   - Use no more than 80% of each block
   - Derive the colour scheme from the content
   - Use simple inline SVG icons to reinforce meaning

4. BALANCE
   - Balance stability with creativity
   - Check colour harmony and a clear visual hierarchy
   - Never exceed {width}px × {height}px

OUTPUT FORMAT
   - Each card is one self-contained HTML fragment: a single root <div> with
     inline styles, width {width}px and height {height}px
   - No <script>, no external stylesheets, no external images
   - Answer ONLY with JSON of the form
     {"cards":[{"style":"<style key>","html":"<div ...>...</div>"}]}
   - One card per requested style, in the requested order
   - Do NOT wrap the JSON in code fences and do NOT add commentary"#;

/// Render the system prompt for a canvas, filling in the size placeholders.
pub fn system_prompt(template: &str, canvas: &CanvasSpec) -> String {
    template
        .replace("{width}", &canvas.width.to_string())
        .replace("{height}", &canvas.height.to_string())
        .replace("{safe_width}", &canvas.width.saturating_sub(60).to_string())
        .replace("{safe_height}", &canvas.height.saturating_sub(60).to_string())
}

/// Build the user message: requested styles followed by the source text.
pub fn card_request(source: &str, styles: &[CardStyle]) -> String {
    let mut msg = format!(
        "Create {} concept cards, one for each of these styles:\n",
        styles.len()
    );
    for style in styles {
        msg.push_str(&format!("- {} ({})\n", style.key(), style.brief()));
    }
    msg.push_str("\nSource text:\n\"\"\"\n");
    msg.push_str(source);
    msg.push_str("\n\"\"\"");
    msg
}
