use std::io::Write;

use quick_xml::{
    events::{BytesDecl, BytesEnd, BytesStart, BytesText, Event},
    Writer,
};
use time::{format_description::well_known::Rfc2822, OffsetDateTime};

use crate::{config::SiteConfig, posts::repo_types::PostWithCategory, posts::services::summary};

pub const FEED_ITEMS: i64 = 20;
const DESCRIPTION_LEN: usize = 300;

pub(super) fn write_text_element<W: Write>(
    w: &mut Writer<W>,
    name: &str,
    text: &str,
) -> anyhow::Result<()> {
    w.write_event(Event::Start(BytesStart::new(name)))?;
    w.write_event(Event::Text(BytesText::new(text)))?;
    w.write_event(Event::End(BytesEnd::new(name)))?;
    Ok(())
}

/// RSS 2.0 document for the newest published posts.
pub fn render_rss(
    site: &SiteConfig,
    posts: &[PostWithCategory],
    now: OffsetDateTime,
) -> anyhow::Result<String> {
    let mut w = Writer::new_with_indent(Vec::new(), b' ', 2);
    w.write_event(Event::Decl(BytesDecl::new("1.0", Some("UTF-8"), None)))?;

    let mut rss = BytesStart::new("rss");
    rss.push_attribute(("version", "2.0"));
    rss.push_attribute(("xmlns:atom", "http://www.w3.org/2005/Atom"));
    w.write_event(Event::Start(rss))?;
    w.write_event(Event::Start(BytesStart::new("channel")))?;

    write_text_element(&mut w, "title", &site.title)?;
    write_text_element(&mut w, "link", &site.base_url)?;
    write_text_element(&mut w, "description", &site.description)?;
    write_text_element(&mut w, "language", &site.language)?;
    write_text_element(&mut w, "lastBuildDate", &now.format(&Rfc2822)?)?;

    let self_href = format!("{}/feed.xml", site.base_url);
    let mut atom = BytesStart::new("atom:link");
    atom.push_attribute(("href", self_href.as_str()));
    atom.push_attribute(("rel", "self"));
    atom.push_attribute(("type", "application/rss+xml"));
    w.write_event(Event::Empty(atom))?;

    for item in posts {
        let post = &item.post;
        let link = format!("{}/post/{}", site.base_url, post.id);
        let published = post.published_at.unwrap_or(post.created_at);

        w.write_event(Event::Start(BytesStart::new("item")))?;
        write_text_element(&mut w, "title", &post.title)?;
        write_text_element(&mut w, "link", &link)?;

        let mut guid = BytesStart::new("guid");
        guid.push_attribute(("isPermaLink", "true"));
        w.write_event(Event::Start(guid))?;
        w.write_event(Event::Text(BytesText::new(&link)))?;
        w.write_event(Event::End(BytesEnd::new("guid")))?;

        write_text_element(&mut w, "pubDate", &published.format(&Rfc2822)?)?;
        write_text_element(
            &mut w,
            "category",
            item.category_name.as_deref().unwrap_or("Other"),
        )?;
        write_text_element(&mut w, "description", &summary(post, DESCRIPTION_LEN))?;
        w.write_event(Event::End(BytesEnd::new("item")))?;
    }

    w.write_event(Event::End(BytesEnd::new("channel")))?;
    w.write_event(Event::End(BytesEnd::new("rss")))?;

    Ok(String::from_utf8(w.into_inner())?)
}
