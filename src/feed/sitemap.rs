use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, Event},
    Writer,
};
use time::{format_description::well_known::Rfc3339, OffsetDateTime};

use super::rss::write_text_element;
use crate::{categories::repo_types::Category, config::SiteConfig, posts::repo_types::SitemapRow};

const SITEMAP_NS: &str = "http://www.sitemaps.org/schemas/sitemap/0.9";

struct Entry<'a> {
    loc: String,
    lastmod: OffsetDateTime,
    changefreq: &'a str,
    priority: &'a str,
}

pub fn render_sitemap(
    site: &SiteConfig,
    posts: &[SitemapRow],
    categories: &[Category],
    now: OffsetDateTime,
) -> anyhow::Result<String> {
    let mut entries = vec![Entry {
        loc: format!("{}/", site.base_url),
        lastmod: now,
        changefreq: "daily",
        priority: "1.0",
    }];
    entries.extend(posts.iter().map(|p| Entry {
        loc: format!("{}/post/{}", site.base_url, p.id),
        lastmod: p.updated_at,
        changefreq: "weekly",
        priority: "0.8",
    }));
    entries.extend(categories.iter().map(|c| Entry {
        loc: format!("{}/?category={}", site.base_url, c.id),
        lastmod: c.updated_at,
        changefreq: "weekly",
        priority: "0.6",
    }));

    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;
    let mut urlset = BytesStart::new("urlset");
    urlset.push_attribute(("xmlns", SITEMAP_NS));
    w.write_event(Event::Start(urlset))?;

    for e in &entries {
        w.write_event(Event::Start(BytesStart::new("url")))?;
        write_text_element(&mut w, "loc", &e.loc)?;
        write_text_element(&mut w, "lastmod", &e.lastmod.format(&Rfc3339)?)?;
        write_text_element(&mut w, "changefreq", e.changefreq)?;
        write_text_element(&mut w, "priority", e.priority)?;
        w.write_event(Event::End(BytesEnd::new("url")))?;
    }

    w.write_event(Event::End(BytesEnd::new("urlset")))?;
    Ok(String::from_utf8(w.into_inner())?)
}

pub fn render_robots(site: &SiteConfig) -> String {
    format!(
        "User-agent: *\nAllow: /\nDisallow: /admin/\nDisallow: /api/admin/\n\nSitemap: {}/sitemap.xml\n",
        site.base_url
    )
}
