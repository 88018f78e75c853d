use super::screenshots::SavedImage;

pub fn image_tag(web_path: &str) -> String {
    format!(
        r#"<img src="{}" alt="Screenshot" style="max-width: 100%; height: auto;" />"#,
        web_path
    )
}

/// Combine the selected text and image markup into at most one string
pub fn render(text: Option<String>, images: &[SavedImage]) -> Vec<String> {
    let tags: Vec<String> = images.iter().map(|image| image_tag(&image.web_path)).collect();

    match (text, tags.is_empty()) {
        (Some(text), true) => vec![text],
        (Some(text), false) => vec![format!("{}\n\n{}", text, tags.join("\n"))],
        (None, false) => vec![tags.join("\n")],
        (None, true) => Vec::new(),
    }
}
