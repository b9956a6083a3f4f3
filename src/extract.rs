//! Per-item field extraction.
//!
//! Every listing row is a `tr.bookalike` whose cells are `td.field.<name>`.
//! Several cells keep their machine-readable value in a `div.value` that the
//! site hides from rendering, so those are read from `textContent` rather
//! than from rendered text.

use crate::error::{Error, Result};
use crate::locator::Locator;
use crate::session::BrowserSession;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRating {
    Unrated,
    Stars(u8),
}

// Checked in order: "liked it" is a suffix of "really liked it".
const STAR_LABELS: [(&str, u8); 5] = [
    ("it was amazing", 5),
    ("really liked it", 4),
    ("did not like it", 1),
    ("it was ok", 2),
    ("liked it", 3),
];

impl UserRating {
    /// Normalizes the site's star label into a star count.
    pub fn from_label(label: &str) -> Self {
        let label = label.trim().to_lowercase();
        for (phrase, stars) in STAR_LABELS {
            if label.contains(phrase) {
                return UserRating::Stars(stars);
            }
        }

        // "4 of 5 stars"
        let tokens: Vec<&str> = label.split_whitespace().collect();
        for window in tokens.windows(4) {
            if window[1] == "of" && window[2] == "5" && window[3].starts_with("star") {
                if let Ok(n) = window[0].parse::<u8>() {
                    if (1..=5).contains(&n) {
                        return UserRating::Stars(n);
                    }
                }
            }
        }

        UserRating::Unrated
    }

    pub fn stars(&self) -> Option<u8> {
        match self {
            UserRating::Unrated => None,
            UserRating::Stars(n) => Some(*n),
        }
    }
}

impl fmt::Display for UserRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserRating::Unrated => f.write_str("unrated"),
            UserRating::Stars(n) => write!(f, "{}", n),
        }
    }
}

/// One book from the listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookRecord {
    pub title: String,
    pub isbn: String,
    pub isbn13: String,
    pub author_name: String,
    pub author_id: u64,
    pub author_link: String,
    pub avg_rating: f64,
    pub user_rating: UserRating,
    pub num_pages: Option<u32>,
    pub publishing_date: String,
    pub started_date: String,
    pub finished_date: String,
    pub added_date: String,
}

impl BookRecord {
    pub const FIELD_NAMES: [&'static str; 13] = [
        "title",
        "isbn",
        "isbn13",
        "author_name",
        "author_id",
        "author_link",
        "avg_rating",
        "user_rating",
        "num_pages",
        "publishing_date",
        "started_date",
        "finished_date",
        "added_date",
    ];

    /// Flat string values in `FIELD_NAMES` order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.title.clone(),
            self.isbn.clone(),
            self.isbn13.clone(),
            self.author_name.clone(),
            self.author_id.to_string(),
            self.author_link.clone(),
            format!("{:.2}", self.avg_rating),
            self.user_rating.to_string(),
            self.num_pages.map(|n| n.to_string()).unwrap_or_default(),
            self.publishing_date.clone(),
            self.started_date.clone(),
            self.finished_date.clone(),
            self.added_date.clone(),
        ]
    }
}

/// First whitespace-delimited all-digit token that fits a page count.
pub fn parse_num_pages(raw: &str) -> Option<u32> {
    raw.split_whitespace()
        .filter(|token| token.chars().all(|c| c.is_ascii_digit()))
        .find_map(|token| token.parse().ok())
}

/// `https://host/author/show/12345.Jane_Doe` -> `12345`.
pub fn parse_author_id(link: &str) -> Result<u64> {
    let path = match url::Url::parse(link) {
        Ok(url) => url.path().to_string(),
        Err(_) => link
            .split(|c| c == '?' || c == '#')
            .next()
            .unwrap_or_default()
            .to_string(),
    };
    let segment = path.rsplit('/').next().unwrap_or_default();
    let id = segment.split('.').next().unwrap_or_default();
    id.parse::<u64>()
        .map_err(|e| Error::Parse(format!("author id in {:?}: {}", link, e)))
}

pub fn parse_avg_rating(raw: &str) -> Result<f64> {
    let rating = raw
        .trim()
        .parse::<f64>()
        .map_err(|e| Error::Parse(format!("average rating {:?}: {}", raw, e)))?;
    if !rating.is_finite() || !(0.0..=5.0).contains(&rating) {
        return Err(Error::Parse(format!("average rating {} out of range", rating)));
    }
    Ok(rating)
}

fn field(name: &str) -> Locator {
    Locator::tag_with_classes("td", &["field", name])
}

fn value() -> Locator {
    Locator::tag_with_classes("div", &["value"])
}

/// Locators for each cell of a listing row.
#[derive(Debug, Clone)]
pub struct FieldLocators {
    pub isbn: Locator,
    pub isbn13: Locator,
    pub title: Locator,
    pub author: Locator,
    pub avg_rating: Locator,
    pub rating: Locator,
    pub num_pages: Locator,
    pub date_pub: Locator,
    pub date_started: Locator,
    pub date_read: Locator,
    pub date_added: Locator,
}

impl Default for FieldLocators {
    fn default() -> Self {
        Self {
            isbn: field("isbn").descendant(value()),
            isbn13: field("isbn13").descendant(value()),
            title: field("title"),
            author: field("author").descendant(value()).descendant(Locator::tag("a")),
            avg_rating: field("avg_rating").child(value()),
            rating: field("rating"),
            num_pages: field("num_pages"),
            date_pub: field("date_pub").child(value()),
            date_started: field("date_started").child(value()),
            date_read: field("date_read").child(value()),
            date_added: field("date_added").child(value()),
        }
    }
}

pub struct FieldExtractor {
    locators: FieldLocators,
}

impl Default for FieldExtractor {
    fn default() -> Self {
        Self::new(FieldLocators::default())
    }
}

impl FieldExtractor {
    pub fn new(locators: FieldLocators) -> Self {
        Self { locators }
    }

    async fn hidden<S: BrowserSession>(
        &self,
        session: &S,
        item: &S::Element,
        locator: &Locator,
    ) -> Result<String> {
        let holder = session.find_within(item, locator).await?;
        session.read_raw_text(&holder).await
    }

    async fn visible<S: BrowserSession>(
        &self,
        session: &S,
        item: &S::Element,
        locator: &Locator,
    ) -> Result<String> {
        let element = session.find_within(item, locator).await?;
        session.read_text(&element).await
    }

    pub async fn extract<S: BrowserSession>(&self, session: &S, item: &S::Element) -> Result<BookRecord> {
        let l = &self.locators;

        let isbn = self.hidden(session, item, &l.isbn).await?;
        let isbn13 = self.hidden(session, item, &l.isbn13).await?;
        let title = self.visible(session, item, &l.title).await?;

        let author = session.find_within(item, &l.author).await?;
        let author_name = session.read_text(&author).await?;
        let author_link = session
            .read_attribute(&author, "href")
            .await?
            .ok_or_else(|| Error::ElementNotFound(format!("{}[href]", l.author)))?;
        let author_id = parse_author_id(&author_link)?;

        let avg_rating = parse_avg_rating(&self.hidden(session, item, &l.avg_rating).await?)?;
        let user_rating = UserRating::from_label(&self.visible(session, item, &l.rating).await?);
        let num_pages = parse_num_pages(&self.hidden(session, item, &l.num_pages).await?);

        let publishing_date = self.hidden(session, item, &l.date_pub).await?;
        let started_date = self.hidden(session, item, &l.date_started).await?;
        let finished_date = self.hidden(session, item, &l.date_read).await?;
        let added_date = self.hidden(session, item, &l.date_added).await?;

        Ok(BookRecord {
            title,
            isbn,
            isbn13,
            author_name,
            author_id,
            author_link,
            avg_rating,
            user_rating,
            num_pages,
            publishing_date,
            started_date,
            finished_date,
            added_date,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::SnapshotSession;

    const ROW: &str = r#"<html><body><table><tr class="bookalike review">
        <td class="field isbn"><label>isbn</label><div class="value" style="display:none">0441013597</div></td>
        <td class="field isbn13"><label>isbn13</label><div class="value" style="display:none">9780441013593</div></td>
        <td class="field title"><label style="display:none">title</label><div class="value"><a href="/book/show/234225.Dune">Dune</a></div></td>
        <td class="field author"><label style="display:none">author</label><div class="value"><a href="https://www.goodreads.com/author/show/58.Frank_Herbert">Herbert, Frank</a></div></td>
        <td class="field avg_rating"><label>avg rating</label><div class="value" style="display:none">4.27</div></td>
        <td class="field rating"><label style="display:none">my rating</label><div class="value"><span title="it was amazing">it was amazing</span></div></td>
        <td class="field num_pages" style="display:none"><label>num pages</label>
            <div class="value"><nobr>658 <span>pp</span></nobr></div></td>
        <td class="field date_pub"><label>date pub</label><div class="value" style="display:none">Aug 01, 1965</div></td>
        <td class="field date_started"><label>date started</label><div class="value" style="display:none"><span>Jan 02, 2023</span></div></td>
        <td class="field date_read"><label>date read</label><div class="value" style="display:none"><span>Feb 10, 2023</span></div></td>
        <td class="field date_added"><label>date added</label><div class="value" style="display:none"><span>Dec 24, 2022</span></div></td>
    </tr></table></body></html>"#;

    async fn extract(html: &str) -> Result<BookRecord> {
        let session = SnapshotSession::new(vec![html.to_string()]);
        session.navigate("about:blank").await?;
        let item = session.find_one(&Locator::class("bookalike")).await?;
        FieldExtractor::default().extract(&session, &item).await
    }

    #[test]
    fn num_pages_takes_first_digit_token() {
        assert_eq!(parse_num_pages("312 pages"), Some(312));
        assert_eq!(parse_num_pages("pages"), None);
        assert_eq!(parse_num_pages("audiobook 5 hrs"), Some(5));
        assert_eq!(parse_num_pages("num pages\n   658 pp"), Some(658));
        assert_eq!(parse_num_pages("12a 7"), Some(7));
        assert_eq!(parse_num_pages(""), None);
    }

    #[test]
    fn num_pages_skips_oversized_tokens() {
        assert_eq!(parse_num_pages("4294967296 300"), Some(300));
        assert_eq!(parse_num_pages("4294967296 pages"), None);
        assert_eq!(parse_num_pages("4294967295"), Some(u32::MAX));
    }

    #[test]
    fn author_id_from_link() {
        assert_eq!(
            parse_author_id("https://www.goodreads.com/author/show/12345.Jane_Doe").unwrap(),
            12345
        );
        assert_eq!(parse_author_id("/author/show/7.X?from=list").unwrap(), 7);
        assert_eq!(parse_author_id("https://www.goodreads.com/author/show/99").unwrap(), 99);
        assert!(matches!(
            parse_author_id("https://www.goodreads.com/author/show/Jane_Doe"),
            Err(Error::Parse(_))
        ));
    }

    #[test]
    fn avg_rating_must_be_a_rating() {
        assert_eq!(parse_avg_rating(" 4.27 ").unwrap(), 4.27);
        assert_eq!(parse_avg_rating("0.00").unwrap(), 0.0);
        assert!(parse_avg_rating("").is_err());
        assert!(parse_avg_rating("n/a").is_err());
        assert!(parse_avg_rating("5.5").is_err());
        assert!(parse_avg_rating("NaN").is_err());
    }

    #[test]
    fn star_labels_normalize() {
        assert_eq!(UserRating::from_label("it was amazing"), UserRating::Stars(5));
        assert_eq!(UserRating::from_label("Really liked it"), UserRating::Stars(4));
        assert_eq!(UserRating::from_label("liked it"), UserRating::Stars(3));
        assert_eq!(UserRating::from_label("it was ok"), UserRating::Stars(2));
        assert_eq!(UserRating::from_label("did not like it"), UserRating::Stars(1));
        assert_eq!(UserRating::from_label("2 of 5 stars"), UserRating::Stars(2));
        assert_eq!(UserRating::from_label(""), UserRating::Unrated);
        assert_eq!(UserRating::from_label("0 of 5 stars"), UserRating::Unrated);
        assert_eq!(UserRating::Unrated.stars(), None);
    }

    #[tokio::test]
    async fn extracts_full_row() {
        let book = extract(ROW).await.unwrap();

        assert_eq!(book.title, "Dune");
        assert_eq!(book.isbn, "0441013597");
        assert_eq!(book.isbn13, "9780441013593");
        assert_eq!(book.author_name, "Herbert, Frank");
        assert_eq!(book.author_id, 58);
        assert_eq!(
            book.author_link,
            "https://www.goodreads.com/author/show/58.Frank_Herbert"
        );
        assert_eq!(book.avg_rating, 4.27);
        assert_eq!(book.user_rating, UserRating::Stars(5));
        assert_eq!(book.num_pages, Some(658));
        assert_eq!(book.publishing_date, "Aug 01, 1965");
        assert_eq!(book.started_date, "Jan 02, 2023");
        assert_eq!(book.finished_date, "Feb 10, 2023");
        assert_eq!(book.added_date, "Dec 24, 2022");
    }

    #[tokio::test]
    async fn extraction_is_repeatable() {
        let session = SnapshotSession::new(vec![ROW.to_string()]);
        session.navigate("about:blank").await.unwrap();
        let item = session.find_one(&Locator::class("bookalike")).await.unwrap();
        let extractor = FieldExtractor::default();

        let first = extractor.extract(&session, &item).await.unwrap();
        let second = extractor.extract(&session, &item).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.avg_rating.to_bits(), second.avg_rating.to_bits());
    }

    #[tokio::test]
    async fn blank_optional_fields_still_yield_a_record() {
        let html = ROW
            .replace("0441013597", "")
            .replace("9780441013593", "")
            .replace("658 <span>pp</span>", "<span>unknown</span>")
            .replace("Aug 01, 1965", "")
            .replace("Jan 02, 2023", "")
            .replace("Feb 10, 2023", "")
            .replace("Dec 24, 2022", "")
            .replace("it was amazing", "");
        let book = extract(&html).await.unwrap();

        assert_eq!(book.isbn, "");
        assert_eq!(book.num_pages, None);
        assert_eq!(book.user_rating, UserRating::Unrated);
        assert!(book.started_date.is_empty() && book.added_date.is_empty());
    }

    #[tokio::test]
    async fn missing_title_cell_is_fatal() {
        let html = ROW.replace(r#"class="field title""#, r#"class="field other""#);
        assert!(matches!(extract(&html).await, Err(Error::ElementNotFound(_))));
    }

    #[tokio::test]
    async fn malformed_rating_is_fatal() {
        let html = ROW.replace(">4.27<", ">not rated<");
        assert!(matches!(extract(&html).await, Err(Error::Parse(_))));
    }

    #[test]
    fn row_matches_field_names() {
        let book = BookRecord {
            title: "T".into(),
            isbn: String::new(),
            isbn13: String::new(),
            author_name: "A".into(),
            author_id: 1,
            author_link: "l".into(),
            avg_rating: 3.5,
            user_rating: UserRating::Unrated,
            num_pages: None,
            publishing_date: String::new(),
            started_date: String::new(),
            finished_date: String::new(),
            added_date: String::new(),
        };
        let row = book.to_row();
        assert_eq!(row.len(), BookRecord::FIELD_NAMES.len());
        assert_eq!(row[6], "3.50");
        assert_eq!(row[7], "unrated");
        assert_eq!(row[8], "");
    }
}
