use shelf_scraper::config::ShelfConfig;
use shelf_scraper::{Error, ShelfScraper, SnapshotSession, UserRating};

const LISTING: &str = "https://www.goodreads.com/review/list/71341746?shelf=read";

fn row(i: usize) -> String {
    let rating = match i % 3 {
        0 => "it was amazing",
        1 => "liked it",
        _ => "",
    };
    let pages = if i % 4 == 0 {
        String::new()
    } else {
        format!("{} pp", 100 + i)
    };
    format!(
        r#"<tr class="bookalike review" id="review_{i}">
  <td class="field isbn"><label>isbn</label> <div class="value" style="display:none">isbn-{i}</div></td>
  <td class="field isbn13"><label>isbn13</label> <div class="value" style="display:none"></div></td>
  <td class="field title"><label style="display:none">title</label> <div class="value"><a href="/book/show/{i}">Book {i}</a></div></td>
  <td class="field author"><label style="display:none">author</label> <div class="value"><a href="https://www.goodreads.com/author/show/{author}.Author_{i}">Author {i}</a></div></td>
  <td class="field avg_rating"><label>avg rating</label> <div class="value" style="display:none">3.{i}</div></td>
  <td class="field rating"><label style="display:none">my rating</label> <div class="value">{rating}</div></td>
  <td class="field num_pages"><label>num pages</label> <div class="value">{pages}</div></td>
  <td class="field date_pub"><label>date pub</label> <div class="value" style="display:none">Jan 01, 2000</div></td>
  <td class="field date_started"><label>date started</label> <div class="value" style="display:none"></div></td>
  <td class="field date_read"><label>date read</label> <div class="value" style="display:none">Mar {i:02}, 2024</div></td>
  <td class="field date_added"><label>date added</label> <div class="value" style="display:none">Feb 01, 2024</div></td>
</tr>"#,
        i = i,
        author = 1000 + i,
        rating = rating,
        pages = pages,
    )
}

fn page(loaded: usize, total: usize) -> String {
    let rows: String = (0..loaded).map(row).collect();
    format!(
        r#"<html><body>
<div class="modal">Sign in to continue</div>
<table id="books"><tbody>{rows}</tbody></table>
<div id="infiniteStatus">{loaded} of {total} loaded</div>
</body></html>"#
    )
}

fn fast_config() -> ShelfConfig {
    ShelfConfig {
        listing_url: Some(LISTING.to_string()),
        page_timeout_ms: 50,
        status_timeout_ms: 50,
        load_timeout_ms: 50,
        ..ShelfConfig::default()
    }
}

#[tokio::test]
async fn scrapes_every_item_in_document_order() {
    let session = SnapshotSession::new(vec![page(3, 8), page(6, 8), page(8, 8)]);
    let counters = session.counters();
    let scraper = ShelfScraper::new(&fast_config());

    let books = scraper.scrape(session, LISTING).await.unwrap();

    let titles: Vec<_> = books.iter().map(|b| b.title.as_str()).collect();
    let expected: Vec<String> = (0..8).map(|i| format!("Book {}", i)).collect();
    assert_eq!(titles, expected);

    assert_eq!(counters.keys_sent(), 2);
    assert_eq!(counters.clicks(), 1);
    assert!(counters.is_closed());

    let first = &books[0];
    assert_eq!(first.isbn, "isbn-0");
    assert_eq!(first.isbn13, "");
    assert_eq!(first.author_id, 1000);
    assert_eq!(first.avg_rating, 3.0);
    assert_eq!(first.user_rating, UserRating::Stars(5));
    assert_eq!(first.num_pages, None);
    assert_eq!(first.started_date, "");
    assert_eq!(first.finished_date, "Mar 00, 2024");

    assert_eq!(books[1].user_rating, UserRating::Stars(3));
    assert_eq!(books[2].user_rating, UserRating::Unrated);
    assert_eq!(books[5].num_pages, Some(105));
    assert_eq!(books[7].author_id, 1007);
}

#[tokio::test]
async fn single_page_listing_needs_no_loading() {
    let session = SnapshotSession::new(vec![page(2, 2)]);
    let counters = session.counters();

    let books = ShelfScraper::new(&fast_config())
        .scrape(session, LISTING)
        .await
        .unwrap();

    assert_eq!(books.len(), 2);
    assert_eq!(counters.keys_sent(), 0);
    assert!(counters.is_closed());
}

#[tokio::test]
async fn progress_is_published() {
    let session = SnapshotSession::new(vec![page(1, 4), page(4, 4)]);
    let scraper = ShelfScraper::new(&fast_config());
    let progress = scraper.watch_progress();

    scraper.scrape(session, LISTING).await.unwrap();

    let last = *progress.borrow();
    assert_eq!((last.loaded, last.total), (4, 4));
}

#[tokio::test]
async fn stall_aborts_and_still_closes_session() {
    let session = SnapshotSession::new(vec![page(3, 9), page(3, 9)]);
    let counters = session.counters();

    let err = ShelfScraper::new(&fast_config())
        .scrape(session, LISTING)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::StallTimeout { .. }), "{err}");
    assert!(counters.is_closed());
}

#[tokio::test]
async fn missing_title_fails_the_whole_run() {
    let broken = page(3, 3).replacen(r#"class="field title""#, r#"class="field""#, 1);
    let session = SnapshotSession::new(vec![broken]);
    let counters = session.counters();

    let err = ShelfScraper::new(&fast_config())
        .scrape(session, LISTING)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ElementNotFound(_)), "{err}");
    assert!(counters.is_closed());
}

#[tokio::test]
async fn missing_status_fragment_is_not_found() {
    let html = page(2, 2).replace(r#"id="infiniteStatus""#, r#"id="other""#);
    let session = SnapshotSession::new(vec![html]);
    let counters = session.counters();

    let err = ShelfScraper::new(&fast_config())
        .scrape(session, LISTING)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::ElementNotFound(_)), "{err}");
    assert!(counters.is_closed());
}

#[tokio::test]
async fn rejected_overlay_click_is_not_fatal() {
    let session = SnapshotSession::new(vec![page(2, 4), page(4, 4)]).fail_clicks();
    let counters = session.counters();

    let books = ShelfScraper::new(&fast_config())
        .scrape(session, LISTING)
        .await
        .unwrap();

    assert_eq!(books.len(), 4);
    assert_eq!(counters.clicks(), 1);
    assert!(counters.is_closed());
}

#[tokio::test]
async fn run_error_wins_over_close_error() {
    let session = SnapshotSession::new(vec![page(3, 9), page(3, 9)]).fail_close();
    let counters = session.counters();

    let err = ShelfScraper::new(&fast_config())
        .scrape(session, LISTING)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::StallTimeout { loaded: 3, .. }), "{err}");
    assert!(counters.is_closed());
}

#[tokio::test]
async fn close_error_after_success_is_reported() {
    let session = SnapshotSession::new(vec![page(2, 2)]).fail_close();
    let counters = session.counters();

    let err = ShelfScraper::new(&fast_config())
        .scrape(session, LISTING)
        .await
        .unwrap_err();

    assert!(matches!(err, Error::Internal(_)), "{err}");
    assert!(counters.is_closed());
}
