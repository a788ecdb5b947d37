use std::path::PathBuf;

/// A single site-chrome element to strip from the saved page.
#[derive(Clone, Copy, Debug)]
pub enum CleanupRule {
    /// Element with this `id` attribute.
    Id(&'static str),
    /// Any element carrying this class.
    Class(&'static str),
    /// `tag` whose `attr` value contains `needle` (empty needle = attribute present).
    Attr {
        tag: &'static str,
        attr: &'static str,
        needle: &'static str,
    },
}

/// InfoQ serves the mobile page (plain markup, direct mp4 source) to this agent.
pub const IPAD_USER_AGENT: &str = "Mozilla/5.0 (iPad; U; CPU OS 3_2 like Mac OS X; en-us) \
     AppleWebKit/531.21.10 (KHTML, like Gecko) Version/4.0.4 Mobile/7B334b Safari/531.21.10";

#[derive(Clone, Debug)]
pub struct Config {
    pub download_dir: PathBuf,
    /// Upper bound on the bytes written and flushed per progress update.
    pub chunk_size: usize,
    pub user_agent: String,
    pub cleanup: Vec<CleanupRule>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            download_dir: PathBuf::from("downloads"),
            chunk_size: 10 * 1024,
            user_agent: IPAD_USER_AGENT.to_string(),
            cleanup: vec![
                CleanupRule::Id("footer"),
                CleanupRule::Id("header"),
                CleanupRule::Id("topInfo"),
                CleanupRule::Class("share_this"),
                CleanupRule::Class("random_links"),
                CleanupRule::Class("vendor_vs_popular"),
                CleanupRule::Class("bottomContent"),
                CleanupRule::Id("id_300x250_banner_top"),
                CleanupRule::Class("presentation_type"),
                CleanupRule::Id("conference"),
                CleanupRule::Id("imgPreload"),
                CleanupRule::Id("text_height_fix_box"),
                CleanupRule::Class("download_presentation"),
                CleanupRule::Class("recorded"),
                CleanupRule::Attr {
                    tag: "script",
                    attr: "async",
                    needle: "",
                },
                CleanupRule::Attr {
                    tag: "script",
                    attr: "src",
                    needle: "addthis",
                },
            ],
        }
    }
}
