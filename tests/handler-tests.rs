use std::io::Write;

#[allow(dead_code)]
mod support;

#[test]
fn canned_response_for_each_method() {
    for method in &["GET", "POST", "PUT", "DELETE", "HEAD"] {
        let (mut client, _log) = support::new_client_to_mock_server("canned");

        write!(
            client,
            "{} /simple-server.php/x HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nContent-Length: 0\r\n\r\n",
            method
        )
        .unwrap();

        let response = support::read_to_string(&mut client);
        assert_eq!(
            support::body_of(&response),
            format!("This is {} method response!", method),
            "wrong body for {}",
            method
        );
    }
}

#[test]
fn get_with_query_parameters() {
    let (mut client, _log) = support::new_client_to_mock_server("get-query");

    write!(
        client,
        "GET /simple-server.php/get?a=1&b=2 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .unwrap();

    let response = support::read_to_string(&mut client);
    assert_eq!(
        support::body_of(&response),
        "This is GET method response! Input: a=1;b=2;"
    );
}

#[test]
fn get_with_nested_query_parameters() {
    let (mut client, _log) = support::new_client_to_mock_server("get-nested");

    write!(
        client,
        "GET /simple-server.php/get?a[x]=1 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .unwrap();

    let response = support::read_to_string(&mut client);
    assert!(support::body_of(&response).contains("a[x=1;];"));
}

#[test]
fn get_with_auto_index_brackets() {
    let (mut client, _log) = support::new_client_to_mock_server("get-auto-index");

    write!(
        client,
        "GET /simple-server.php/get?q=1&something[]=2&something[]=3 HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .unwrap();

    let response = support::read_to_string(&mut client);
    assert_eq!(
        support::body_of(&response),
        "This is GET method response! Input: q=1;something[0=2;1=3;];"
    );
}

#[test]
fn head_response_carries_a_body() {
    // non-standard on purpose; the harness observes the body
    let (mut client, _log) = support::new_client_to_mock_server("head-body");

    write!(
        client,
        "HEAD /simple-server.php/head HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .unwrap();

    let response = support::read_to_string(&mut client);
    assert_eq!(support::body_of(&response), "This is HEAD method response!");
}

#[test]
fn unknown_method_yields_empty_body() {
    let (mut client, _log) = support::new_client_to_mock_server("unknown-method");

    write!(
        client,
        "PATCH /simple-server.php/patch HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .unwrap();

    let response = support::read_to_string(&mut client);
    assert!(response.starts_with("HTTP/1.1 200 OK\r\n"));
    assert_eq!(support::body_of(&response), "");
}

#[test]
fn chunked_put_body_is_decoded() {
    let (mut client, log) = support::new_client_to_mock_server("chunked-put");

    write!(
        client,
        "PUT /simple-server.php/put HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\nTransfer-Encoding: chunked\r\n\r\n3\r\nk=v\r\n0\r\n\r\n"
    )
    .unwrap();

    let response = support::read_to_string(&mut client);
    assert_eq!(support::body_of(&response), "This is PUT method response!");

    let trace = std::fs::read_to_string(&log).unwrap();
    assert!(trace.contains("[k] => v"));
}

#[test]
fn keep_alive_serves_two_requests() {
    let (addr, _log) = support::new_mock_server("keep-alive", 2);
    let mut client = std::net::TcpStream::connect(addr).unwrap();

    write!(
        client,
        "GET /simple-server.php/get?a=1 HTTP/1.1\r\nHost: localhost\r\n\r\n"
    )
    .unwrap();
    write!(
        client,
        "GET /simple-server.php/get HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
    )
    .unwrap();

    let both = support::read_to_string(&mut client);
    assert!(both.contains("This is GET method response! Input: a=1;"));
    assert!(both.ends_with("This is GET method response!"));
}

#[test]
fn malformed_request_line_gets_400() {
    let (mut client, _log) = support::new_client_to_mock_server("malformed");

    write!(client, "garbage\r\n\r\n").unwrap();

    let response = support::read_to_string(&mut client);
    assert!(response.starts_with("HTTP/1.1 400"));
}

#[test]
fn http_1_0_closes_the_connection() {
    let (mut client, _log) = support::new_client_to_mock_server("http-1-0");

    write!(
        client,
        "GET /simple-server.php/get HTTP/1.0\r\nHost: localhost\r\n\r\n"
    )
    .unwrap();

    // read_to_string returning proves the server closed the connection
    let response = support::read_to_string(&mut client);
    assert!(response.contains("Connection: close\r\n"));
    assert_eq!(support::body_of(&response), "This is GET method response!");
}
