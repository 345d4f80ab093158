/// Link target of the navigation line at the top of every blog post.
pub const HOME_PAGE: &str = "./index.html";

/// Prepends blog post navigation and a title heading to Markdown source.
#[must_use]
pub fn wrap_blog(title: &str, markdown: &str) -> String {
    format!("\n**[home]({HOME_PAGE})**\n\n# {title}\n\n{markdown}\n")
}
