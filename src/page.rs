use anyhow::{Context, Result};
use regex::{Captures, Regex};

use crate::config::CleanupRule;
use crate::utils::filename_from_url;

const SLIDE_PATTERN: &str = r"'(/resource/presentations/[^']*?/en/slides/[^']*?)'";
const SLIDE_PREFIX_PATTERN: &str = r"/resource/presentations/[^']*?/en/";

/// A presentation page reduced to what the offline copy needs: the title
/// (directory name), the remote video source, the slide references, and the
/// page markup rewritten so every reference resolves locally.
#[derive(Debug)]
pub struct Presentation {
    pub title: String,
    pub video_url: String,
    pub video_file: String,
    pub slides: Vec<String>,
    pub html: String,
}

impl Presentation {
    pub fn parse(html: &str, cleanup: &[CleanupRule]) -> Result<Presentation> {
        let title_re = Regex::new(r"(?s)<title>(.*?)</title>")?;
        let title = title_re
            .captures(html)
            .context("Page has no <title> element")?[1]
            .trim()
            .to_string();

        let source_re = Regex::new(r#"(?s)<video[^>]*>.*?<source[^>]*src="([^"]+)""#)?;
        let video_url = source_re
            .captures(html)
            .context("Page has no <video> source; is the mobile user agent set?")?[1]
            .to_string();
        let video_file = filename_from_url(&video_url)?;

        let slide_re = Regex::new(SLIDE_PATTERN)?;
        let slides: Vec<String> = slide_re
            .captures_iter(html)
            .map(|caps| caps[1].to_string())
            .collect();

        let mut local = html.to_string();
        for rule in cleanup {
            strip_rule(&mut local, rule)?;
        }
        local = local.replace(&video_url, &video_file);
        let prefix_re = Regex::new(SLIDE_PREFIX_PATTERN)?;
        local = prefix_re.replace_all(&local, "").into_owned();
        local = neutralize_wrapper_background(&local)?;

        Ok(Presentation {
            title,
            video_url,
            video_file,
            slides,
            html: local,
        })
    }
}

fn opening_tag_regex(rule: &CleanupRule) -> Result<Regex> {
    let pattern = match rule {
        CleanupRule::Id(id) => format!(
            r#"<([a-zA-Z][a-zA-Z0-9]*)\b[^>]*\bid="{}"[^>]*>"#,
            regex::escape(id)
        ),
        CleanupRule::Class(class) => format!(
            r#"<([a-zA-Z][a-zA-Z0-9]*)\b[^>]*\bclass="[^"]*\b{}\b[^"]*"[^>]*>"#,
            regex::escape(class)
        ),
        // Attribute presence, not a substring of some other attribute's
        // value: whitespace before the name, then end-of-tag, `=`, `/` or
        // more attributes.
        CleanupRule::Attr { tag, attr, needle } if needle.is_empty() => format!(
            r#"<({})\b[^>]*\s{}(?:[\s=/][^>]*)?>"#,
            regex::escape(tag),
            regex::escape(attr)
        ),
        CleanupRule::Attr { tag, attr, needle } => format!(
            r#"<({})\b[^>]*\b{}="[^"]*{}[^"]*"[^>]*>"#,
            regex::escape(tag),
            regex::escape(attr),
            regex::escape(needle)
        ),
    };
    Ok(Regex::new(&pattern)?)
}

/// Removes every element matching `rule`, opening tag through balanced
/// closing tag. Without a closing tag only the opening tag goes, which still
/// lets the loop terminate on malformed markup.
fn strip_rule(html: &mut String, rule: &CleanupRule) -> Result<()> {
    let open_re = opening_tag_regex(rule)?;

    loop {
        let (start, open_end, tag) = match open_re.captures(html) {
            Some(caps) => {
                let m = caps.get(0).context("match without a whole-match group")?;
                (m.start(), m.end(), caps[1].to_string())
            }
            None => break,
        };

        let end = if html[start..open_end].ends_with("/>") {
            open_end
        } else {
            element_end(html, &tag, open_end)?.unwrap_or(open_end)
        };
        html.replace_range(start..end, "");
    }

    Ok(())
}

/// Scans forward from the end of an opening tag and returns the offset just
/// past the matching close, counting nested same-name tags.
fn element_end(html: &str, tag: &str, open_end: usize) -> Result<Option<usize>> {
    let tag_re = Regex::new(&format!(r"(?i)</?{}\b[^>]*>", regex::escape(tag)))?;
    let mut depth = 1usize;

    for m in tag_re.find_iter(&html[open_end..]) {
        if m.as_str().starts_with("</") {
            depth -= 1;
            if depth == 0 {
                return Ok(Some(open_end + m.end()));
            }
        } else if !m.as_str().ends_with("/>") {
            depth += 1;
        }
    }

    Ok(None)
}

/// The original page paints the whole wrapper with a site background; the
/// offline copy blanks it out.
fn neutralize_wrapper_background(html: &str) -> Result<String> {
    let wrapper_re = Regex::new(r#"<[a-zA-Z][a-zA-Z0-9]*\b[^>]*\bid="wrapper"[^>]*>"#)?;
    let style_re = Regex::new(r#"style="[^"]*""#)?;

    Ok(wrapper_re
        .replace(html, |caps: &Captures| {
            let tag = &caps[0];
            if style_re.is_match(tag) {
                style_re
                    .replace(tag, r#"style="background: none""#)
                    .into_owned()
            } else {
                format!(r#"{} style="background: none">"#, &tag[..tag.len() - 1])
            }
        })
        .into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    const SAMPLE: &str = r#"<html><head><title> Evolving the Key/Value Store </title></head>
<body><div id="wrapper" style="background: url(bg.png)">
<div id="header"><div id="menu">nav</div></div>
<div class="share_this big"><span>share</span></div>
<script async src="https://ads.example.com/ads.js"></script>
<script src="http://s7.addthis.com/js/250/addthis_widget.js"></script>
<video controls><source src="http://mfile.example.com/presentations/kv-store.mp4" type="video/mp4"/></video>
<script>var slides = ['/resource/presentations/kv-store/en/slides/1.swf.jpg','/resource/presentations/kv-store/en/slides/2.swf.jpg'];</script>
</div></body></html>"#;

    fn parsed() -> Presentation {
        Presentation::parse(SAMPLE, &Config::default().cleanup).unwrap()
    }

    #[test]
    fn extracts_title_video_and_slides() {
        let page = parsed();
        assert_eq!(page.title, "Evolving the Key/Value Store");
        assert_eq!(
            page.video_url,
            "http://mfile.example.com/presentations/kv-store.mp4"
        );
        assert_eq!(page.video_file, "kv-store.mp4");
        assert_eq!(
            page.slides,
            vec![
                "/resource/presentations/kv-store/en/slides/1.swf.jpg",
                "/resource/presentations/kv-store/en/slides/2.swf.jpg"
            ]
        );
    }

    #[test]
    fn rewrites_references_to_local_files() {
        let page = parsed();
        assert!(page.html.contains(r#"<source src="kv-store.mp4""#));
        assert!(page.html.contains("'slides/1.swf.jpg'"));
        assert!(!page.html.contains("/resource/presentations/"));
    }

    #[test]
    fn strips_configured_site_chrome() {
        let page = parsed();
        assert!(!page.html.contains(r#"id="header""#));
        assert!(!page.html.contains("nav"));
        assert!(!page.html.contains("share_this"));
        assert!(!page.html.contains("ads.js"));
        assert!(!page.html.contains("addthis"));
        // The inline slides script carries none of the markers and stays.
        assert!(page.html.contains("var slides"));
    }

    #[test]
    fn wrapper_background_is_blanked() {
        let page = parsed();
        assert!(page
            .html
            .contains(r#"<div id="wrapper" style="background: none">"#));
    }

    #[test]
    fn nested_same_name_tags_are_removed_in_full() {
        let mut html =
            r#"<p>keep</p><div id="x"><div>inner</div>tail</div><p>also keep</p>"#.to_string();
        strip_rule(&mut html, &CleanupRule::Id("x")).unwrap();
        assert_eq!(html, "<p>keep</p><p>also keep</p>");
    }

    #[test]
    fn bare_attribute_rule_requires_the_attribute_itself() {
        let rule = CleanupRule::Attr {
            tag: "script",
            attr: "async",
            needle: "",
        };

        let mut html = r#"<script src="lib-async.js">keep()</script><script async src="ads.js">drop()</script><script async>also drop</script>"#.to_string();
        strip_rule(&mut html, &rule).unwrap();
        assert_eq!(html, r#"<script src="lib-async.js">keep()</script>"#);
    }

    #[test]
    fn missing_video_source_is_an_error() {
        let err = Presentation::parse("<html><title>t</title></html>", &[]).unwrap_err();
        assert!(err.to_string().contains("video"));
    }
}
