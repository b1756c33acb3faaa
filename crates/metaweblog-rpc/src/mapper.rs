//! Page → protocol record mapping.

use metaweblog_types::{Article, Category, ContentPage, PagePart};

/// Builds the client view of a post.
///
/// `categories` is present only when the page has a parent; a page
/// without a publication time reports an empty `dateCreated`.
pub fn to_article(
    page: &ContentPage,
    parent: Option<&ContentPage>,
    body: &PagePart,
    site_base: &str,
) -> Article {
    let url = absolute(site_base, &page.url);
    Article {
        description: Some(body.content.clone()),
        title: Some(page.title.clone()),
        postid: Some(page.id.to_string()),
        url: Some(url.clone()),
        link: Some(url.clone()),
        perma_link: Some(url),
        categories: parent.map(|p| vec![p.title.clone()]),
        text_more: None,
        date_created: Some(
            page.published_at
                .map(|t| t.to_db_string())
                .unwrap_or_default(),
        ),
    }
}

/// Builds the client view of an archive container.
pub fn to_category(page: &ContentPage, site_base: &str) -> Category {
    let url = absolute(site_base, &page.url);
    Category {
        title: page.title.clone(),
        category_name: page.title.clone(),
        description: page.title.clone(),
        html_url: url.clone(),
        rss_url: url,
    }
}

fn absolute(site_base: &str, url: &str) -> String {
    format!("{}{}", site_base.trim_end_matches('/'), url)
}
