use gleaner_engine::{decode_page, fetch_page, FetchSettings, PageError, ReqwestFetcher};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fetcher() -> ReqwestFetcher {
    ReqwestFetcher::new(FetchSettings::default()).expect("client builds")
}

#[test]
fn decodes_utf8_with_bom() {
    let mut bytes = vec![0xEF, 0xBB, 0xBF];
    bytes.extend_from_slice("<html>hi</html>".as_bytes());

    let page = decode_page(&bytes, None).unwrap();
    assert_eq!(page.html, "<html>hi</html>");
    assert_eq!(page.encoding_label, "UTF-8");
}

#[test]
fn decodes_gbk_declared_in_the_content_type() {
    // "中文" in GBK.
    let mut bytes = b"<html><body>".to_vec();
    bytes.extend_from_slice(&[0xD6, 0xD0, 0xCE, 0xC4]);
    bytes.extend_from_slice(b"</body></html>");

    let page = decode_page(&bytes, Some("text/html; charset=gbk")).unwrap();
    assert!(page.html.contains("中文"));
    assert_eq!(page.encoding_label, "GBK");
}

#[test]
fn decodes_gbk_declared_in_a_meta_tag() {
    let mut bytes =
        b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=gbk\"></head><body>"
            .to_vec();
    bytes.extend_from_slice(&[0xD6, 0xD0, 0xCE, 0xC4]);
    bytes.extend_from_slice(b"</body></html>");

    let page = decode_page(&bytes, Some("text/html")).unwrap();
    assert!(page.html.contains("中文"));
    assert_eq!(page.encoding_label, "GBK");
}

#[test]
fn falls_back_to_sniffing_when_nothing_is_declared() {
    let bytes = b"<html><body>plain ascii page</body></html>".to_vec();
    let page = decode_page(&bytes, None).unwrap();
    assert!(page.html.contains("plain ascii page"));
}

#[tokio::test]
async fn page_fetch_returns_decoded_html() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/thread/1"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_raw("<html><img src=\"/a.jpg\"></html>", "text/html; charset=utf-8"),
        )
        .mount(&server)
        .await;

    let url = format!("{}/thread/1", server.uri());
    let page = fetch_page(&fetcher(), &url).await.expect("page ok");
    assert!(page.html.contains("a.jpg"));
    assert_eq!(page.final_url, url);
}

#[tokio::test]
async fn page_fetch_rejects_non_html_responses() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api"))
        .respond_with(ResponseTemplate::new(200).set_body_raw("{}", "application/json"))
        .mount(&server)
        .await;

    let err = fetch_page(&fetcher(), &format!("{}/api", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, PageError::NotHtml { .. }));
}

#[tokio::test]
async fn page_fetch_propagates_http_failures() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/down"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = fetch_page(&fetcher(), &format!("{}/down", server.uri()))
        .await
        .unwrap_err();
    assert!(matches!(err, PageError::Fetch(_)));
}
