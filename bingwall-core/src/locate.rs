//! Extraction of the background image reference from homepage markup.
//!
//! The homepage embeds its image of the day as a CSS declaration such as
//! `url:'/th?id=OHR.Example_1920x1080.jpg'`. The scan is deliberately
//! shallow: the first marker wins, and the first single-quoted run after it
//! is taken as the image path. Anything malformed means "no image found".

use std::fmt;

/// Literal announcing the background image declaration.
pub const MARKER: &str = "url:";

/// Absolute address of an image to download.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageReference(String);

impl ImageReference {
    /// Prefixes a path extracted from markup with `host`, verbatim.
    ///
    /// No separator is inserted and the path is not inspected, so the
    /// result is always `host` followed by `path`. Returns `None` for an
    /// empty path.
    pub fn resolve(path: &str, host: &str) -> Option<Self> {
        if path.is_empty() {
            return None;
        }

        Some(Self(format!("{}{}", host, path)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Token<'a> {
    /// Markup not otherwise recognised.
    Text(&'a str),
    /// The first occurrence of [`MARKER`].
    Marker,
    /// Contents between a pair of single quotes after the marker.
    Quoted(&'a str),
    /// An opening quote with no closing partner; holds the remainder.
    Unterminated(&'a str),
}

/// Splits markup into tokens. Quotes are only recognised once the marker
/// has been seen; later markers are plain text.
struct Tokenizer<'a> {
    rest: &'a str,
    seen_marker: bool,
}

impl<'a> Tokenizer<'a> {
    fn new(markup: &'a str) -> Self {
        Self { rest: markup, seen_marker: false }
    }

    fn take_text(&mut self, len: usize) -> Token<'a> {
        let (text, rest) = self.rest.split_at(len);
        self.rest = rest;
        Token::Text(text)
    }
}

impl<'a> Iterator for Tokenizer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        if self.rest.is_empty() {
            return None;
        }

        if !self.seen_marker {
            let token = match self.rest.find(MARKER) {
                Some(0) => {
                    self.rest = &self.rest[MARKER.len()..];
                    self.seen_marker = true;
                    Token::Marker
                }
                Some(at) => self.take_text(at),
                None => self.take_text(self.rest.len()),
            };
            return Some(token);
        }

        let token = match self.rest.find('\'') {
            Some(0) => {
                let body = &self.rest[1..];
                match body.find('\'') {
                    Some(end) => {
                        self.rest = &body[end + 1..];
                        Token::Quoted(&body[..end])
                    }
                    None => {
                        self.rest = "";
                        Token::Unterminated(body)
                    }
                }
            }
            Some(at) => self.take_text(at),
            None => self.take_text(self.rest.len()),
        };
        Some(token)
    }
}

/// Finds the image of the day in `markup` and resolves it against `host`.
///
/// Returns `None` ("no image found") when the marker is absent, when no
/// complete quoted path follows it, or when that path is empty.
pub fn locate_image(markup: &str, host: &str) -> Option<ImageReference> {
    let mut tokens = Tokenizer::new(markup);

    tokens.by_ref().find(|token| *token == Token::Marker)?;

    for token in tokens {
        match token {
            Token::Quoted(path) => return ImageReference::resolve(path, host),
            Token::Unterminated(_) => return None,
            Token::Text(_) | Token::Marker => {}
        }
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fetch::BING_HOST;

    #[test]
    fn quoted_path_is_prefixed_with_host() {
        let markup = "<style>#bgDiv{background-image:url:'/th?id=OHR.Fjord_1920x1080.jpg&rf=x.jpg'}</style>";
        let found = locate_image(markup, BING_HOST).unwrap();
        assert_eq!(
            found.as_str(),
            "http://www.bing.com/th?id=OHR.Fjord_1920x1080.jpg&rf=x.jpg"
        );
    }

    #[test]
    fn markup_without_marker_has_no_image() {
        assert_eq!(locate_image("<html><body>'/a.jpg'</body></html>", BING_HOST), None);
        assert_eq!(locate_image("", BING_HOST), None);
    }

    #[test]
    fn first_marker_wins() {
        let markup = "g_img={url: '/first.jpg',d:'x'};g_img2={url:'/second.jpg'}";
        assert_eq!(
            locate_image(markup, BING_HOST).unwrap().as_str(),
            "http://www.bing.com/first.jpg"
        );
    }

    #[test]
    fn quotes_before_marker_are_ignored() {
        let markup = "<a href='/ignored'>x</a> url:'/img.jpg'";
        assert_eq!(
            locate_image(markup, BING_HOST).unwrap().as_str(),
            "http://www.bing.com/img.jpg"
        );
    }

    #[test]
    fn missing_quotes_mean_no_image() {
        assert_eq!(locate_image("url:/img.jpg", BING_HOST), None);
        assert_eq!(locate_image("url:'/img.jpg", BING_HOST), None);
        assert_eq!(locate_image("url:''", BING_HOST), None);
    }

    #[test]
    fn path_is_appended_to_host_unchanged() {
        assert_eq!(
            locate_image("url:'a.jpg'", BING_HOST).unwrap().as_str(),
            "http://www.bing.coma.jpg"
        );
        assert_eq!(
            locate_image("url:'//cdn.example/a.jpg'", BING_HOST).unwrap().as_str(),
            "http://www.bing.com//cdn.example/a.jpg"
        );
        assert_eq!(
            locate_image("url:'https://cdn.example/a.jpg'", BING_HOST).unwrap().as_str(),
            "http://www.bing.comhttps://cdn.example/a.jpg"
        );
        assert_eq!(
            locate_image("url:'a.jpg'", "http://host/").unwrap().as_str(),
            "http://host/a.jpg"
        );
    }

    #[test]
    fn tokenizer_sequence() {
        let tokens: Vec<_> = Tokenizer::new("a'b' url: x 'p' url: 'q").collect();
        assert_eq!(
            tokens,
            vec![
                Token::Text("a'b' "),
                Token::Marker,
                Token::Text(" x "),
                Token::Quoted("p"),
                Token::Text(" url: "),
                Token::Unterminated("q"),
            ]
        );
    }
}
