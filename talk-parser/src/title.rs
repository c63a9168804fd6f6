//! Link targets to page titles
//!
//! Signature detection needs to know which page a link points at. Links come in three shapes:
//! Parsoid-relative (`./User:Example`), script links with a `title=` query parameter
//! (`/w/index.php?title=User:Example&action=edit`), and article-path links (`/wiki/User:Example`).
//! [`TitleResolver`] resolves all of them against a fake origin, then normalizes the title text
//! the way the wiki does: underscores become spaces, the namespace prefix is matched
//! case-insensitively and the first letter is upper-cased when the wiki capitalizes titles.

use crate::error::{ParserError, ParserResult};
use crate::locale::ParserOptions;
use percent_encoding::percent_decode_str;
use regex::Regex;
use std::net::Ipv6Addr;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Namespace {
    Main,
    User,
    UserTalk,
    Special,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Title {
    pub namespace: Namespace,
    /// Title without the namespace prefix, in text form (spaces, not underscores).
    pub text: String,
}

#[derive(Debug, Clone)]
pub struct TitleResolver {
    base: Url,
    article_path: Regex,
    options: ParserOptions,
}

impl TitleResolver {
    pub fn new(options: &ParserOptions) -> ParserResult<Self> {
        let origin = Url::parse("http://localhost/")
            .map_err(|e| ParserError::InvalidLocale(e.to_string()))?;
        // Parsoid links are relative to the directory holding articles.
        let directory = match options.article_path.find("$1") {
            Some(at) => &options.article_path[..at],
            None => options.article_path.as_str(),
        };
        let base = origin
            .join(directory)
            .map_err(|e| ParserError::InvalidLocale(format!("article path: {}", e)))?;
        let pattern = format!(
            "^{}$",
            regex::escape(&options.article_path).replace(&regex::escape("$1"), "(.*)")
        );
        Ok(Self {
            base,
            article_path: Regex::new(&pattern)?,
            options: options.clone(),
        })
    }

    /// The title a link points at, or `None` for links that leave the wiki's page space.
    pub fn title_from_href(&self, href: &str) -> Option<Title> {
        let url = self.base.join(href).ok()?;
        if let Some(captures) = self.article_path.captures(url.path()) {
            let raw = captures.get(1)?.as_str();
            let decoded = percent_decode_str(raw).decode_utf8().ok()?;
            return self.title_from_text(&decoded);
        }
        let (_, title) = url.query_pairs().find(|(key, _)| key == "title")?;
        self.title_from_text(&title)
    }

    pub fn title_from_text(&self, text: &str) -> Option<Title> {
        let text = text.replace('_', " ");
        let text = text.trim();
        if text.is_empty() {
            return None;
        }
        if let Some((prefix, rest)) = text.split_once(':') {
            let namespaces = &self.options.namespaces;
            let known = [
                (Namespace::User, &namespaces.user),
                (Namespace::UserTalk, &namespaces.user_talk),
                (Namespace::Special, &namespaces.special),
            ];
            let prefix = prefix.trim();
            for (namespace, names) in known {
                if names.iter().any(|name| name.eq_ignore_ascii_case(prefix)) {
                    let rest = rest.trim();
                    if rest.is_empty() {
                        return None;
                    }
                    return Some(Title {
                        namespace,
                        text: self.capitalize(rest),
                    });
                }
            }
        }
        Some(Title {
            namespace: Namespace::Main,
            text: self.capitalize(text),
        })
    }

    /// Username a link identifies: a user or user talk page (but not a subpage), or the
    /// contributions special page of that user.
    pub fn username_from_link(&self, href: &str) -> Option<String> {
        let title = self.title_from_href(href)?;
        let username = match title.namespace {
            Namespace::User | Namespace::UserTalk => {
                if title.text.contains('/') {
                    return None;
                }
                title.text
            }
            Namespace::Special => {
                let mut parts = title.text.split('/');
                if parts.next()? != self.options.contributions_page_name {
                    return None;
                }
                // Links to contributions may carry an unnormalized name.
                let raw = parts.next()?.replace('_', " ");
                self.capitalize(raw.trim())
            }
            Namespace::Main => return None,
        };
        if username.is_empty() {
            return None;
        }
        if username.parse::<Ipv6Addr>().is_ok() {
            // Bot-generated "unsigned" links use non-standard case for IPv6 addresses.
            return Some(username.to_uppercase());
        }
        Some(username)
    }

    fn capitalize(&self, text: &str) -> String {
        if !self.options.capital_links {
            return text.to_string();
        }
        let mut chars = text.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect(),
            None => String::new(),
        }
    }
}

/// Text form of a Parsoid resource name: `./Template:Foo_bar%3F` becomes `Template:Foo bar?`.
pub fn normalize_parsoid_resource_name(href: &str) -> String {
    let trimmed = href.strip_prefix("./").unwrap_or(href);
    let decoded = percent_decode_str(trimmed).decode_utf8_lossy();
    decoded.replace('_', " ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn resolver() -> TitleResolver {
        TitleResolver::new(&ParserOptions::default()).unwrap()
    }

    #[rstest]
    #[case("./User:Example", Some("Example"))]
    #[case("/wiki/User_talk:Example", Some("Example"))]
    #[case("/w/index.php?title=User:Example&action=edit&redlink=1", Some("Example"))]
    #[case("/wiki/User:Example?title=User:Other", Some("Example"))]
    #[case("/wiki/Talk:Example?title=User:Other", None)]
    #[case("https://en.wikipedia.org/wiki/user:example", Some("Example"))]
    #[case("./Special:Contributions/example_user", Some("Example user"))]
    #[case("./Special:Contributions/2001:db8::ff00:42:8329", Some("2001:DB8::FF00:42:8329"))]
    #[case("./User:Example/Sandbox", None)]
    #[case("./Special:Watchlist/Example", None)]
    #[case("./Talk:Example", None)]
    #[case("./Example", None)]
    #[case("./User:Caf%C3%A9", Some("Café"))]
    fn usernames_from_links(#[case] href: &str, #[case] expected: Option<&str>) {
        assert_eq!(resolver().username_from_link(href).as_deref(), expected);
    }

    #[test]
    fn custom_article_path() {
        let options = ParserOptions {
            article_path: "/view/$1".to_string(),
            ..ParserOptions::default()
        };
        let resolver = TitleResolver::new(&options).unwrap();
        assert_eq!(
            resolver.username_from_link("/view/User:Example").as_deref(),
            Some("Example")
        );
        assert_eq!(
            resolver.username_from_link("./User:Example").as_deref(),
            Some("Example")
        );
        assert_eq!(resolver.username_from_link("/wiki/User:Example"), None);
    }

    #[test]
    fn lowercase_wikis_keep_case() {
        let options = ParserOptions {
            capital_links: false,
            ..ParserOptions::default()
        };
        let resolver = TitleResolver::new(&options).unwrap();
        assert_eq!(
            resolver.username_from_link("./User:example").as_deref(),
            Some("example")
        );
    }

    #[test]
    fn normalizes_resource_names() {
        assert_eq!(
            normalize_parsoid_resource_name("./Talk:Main_Page/Archive%201"),
            "Talk:Main Page/Archive 1"
        );
    }
}
