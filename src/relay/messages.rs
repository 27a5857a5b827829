//! User-facing texts and prompt composition.

use std::time::Duration;

use crate::error::RelayError;

pub const GENERATING: &str = "🎨 画像を生成中です... しばらくお待ちください";

pub fn image_received(ttl: Duration) -> String {
    let minutes = (ttl.as_secs() / 60).max(1);
    format!(
        "🖼️ 画像を受け取りました！\n{minutes}分以内に、この画像をどう変えたいかテキストで送ってください。"
    )
}

pub fn generated(prompt: &str) -> String {
    format!("✨ 画像が生成されました！\n\nプロンプト: {prompt}")
}

pub fn generation_failed(err: &RelayError) -> String {
    format!("❌ 画像生成中にエラーが発生しました:\n{}", err.user_message())
}

pub fn image_fetch_failed(err: &RelayError) -> String {
    format!("❌ 画像の受け取りに失敗しました:\n{}", err.user_message())
}

/// Fold a reference image description and the user's instruction into one prompt.
pub fn edit_prompt(description: &str, instruction: &str) -> String {
    format!(
        "Reference image: {description}\n\n\
         Create a new image based on the reference image above, \
         applying this instruction: {instruction}"
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_received_mentions_ttl_in_minutes() {
        assert!(image_received(Duration::from_secs(600)).contains("10分以内"));
        assert!(image_received(Duration::from_secs(30)).contains("1分以内"));
    }

    #[test]
    fn edit_prompt_keeps_both_parts() {
        let prompt = edit_prompt("A red bicycle.", "make it blue");
        assert!(prompt.contains("A red bicycle."));
        assert!(prompt.ends_with("make it blue"));
    }
}
