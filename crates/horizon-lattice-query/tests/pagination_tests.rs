//! Integration tests for connection iteration.

mod common;

use common::{
    GRAPHQL_URL, ScriptedTransport, child_names, repositories_page, user_page,
    user_with_repositories,
};
use horizon_lattice_query::{CursorState, Endpoint, QueryError, QueryNode};
use serde_json::json;

#[test]
fn test_two_pages_fetch_exactly_once_more() {
    let transport = ScriptedTransport::new();
    transport
        .reply(user_page(
            json!([{"name": "linux", "stars": 170000}, {"name": "git", "stars": 50000}]),
            true,
            Some("c1"),
        ))
        .reply(repositories_page(json!([{"name": "subsurface", "stars": 2500}]), false, None));
    let endpoint = Endpoint::new(&transport, GRAPHQL_URL).unwrap();

    let mut user = user_with_repositories();
    endpoint.execute(&mut user).unwrap();
    assert_eq!(transport.request_count(), 1);

    let names: Vec<_> = endpoint
        .iterate(&mut user, "repositories", "name")
        .unwrap()
        .collect();
    assert_eq!(
        names,
        vec![Some(json!("linux")), Some(json!("git")), Some(json!("subsurface"))]
    );

    // One incremental request, narrowed to the connection and continuing after c1
    assert_eq!(transport.request_count(), 2);
    assert_eq!(
        transport.query(1),
        "query { user(login:\"torvalds\") { repositories(first:100, after:\"c1\") \
         { nodes { name stars } pageInfo { hasNextPage endCursor } } } } "
    );

    // Siblings are back, with their bound values
    assert_eq!(child_names(&user), ["name", "repositories", "email"]);
    assert_eq!(user.child("name").unwrap().value(), Some(&json!("Linus Torvalds")));
    assert_eq!(user.child("email").unwrap().value(), Some(&json!("torvalds@example.com")));

    let cursor = user.child("repositories").unwrap().cursor().unwrap();
    assert!(!cursor.has_current());
    assert_eq!(cursor.state(), CursorState::Terminal);
    assert_eq!(cursor.pages_loaded(), 2);

    // A new iterator over a finished connection makes no request
    assert_eq!(endpoint.iterate(&mut user, "repositories", "name").unwrap().count(), 0);
    assert_eq!(transport.request_count(), 2);
}

#[test]
fn test_null_errors_member_does_not_end_iteration() {
    let transport = ScriptedTransport::new();
    let mut second = repositories_page(json!([{"name": "git"}]), false, None);
    second["errors"] = json!(null);
    transport
        .reply(user_page(json!([{"name": "linux"}]), true, Some("c1")))
        .reply(second);
    let endpoint = Endpoint::new(&transport, GRAPHQL_URL).unwrap();

    let mut user = user_with_repositories();
    endpoint.execute(&mut user).unwrap();

    let mut failures = 0;
    let names: Vec<_> = endpoint
        .iterate(&mut user, "repositories", "name")
        .unwrap()
        .on_fetch_error(|_| failures += 1)
        .collect();

    assert_eq!(names, vec![Some(json!("linux")), Some(json!("git"))]);
    assert_eq!(failures, 0);
    assert_eq!(transport.request_count(), 2);
}

#[test]
fn test_graphql_error_mid_iteration_ends_sequence() {
    let transport = ScriptedTransport::new();
    transport
        .reply(user_page(json!([{"name": "linux"}, {"name": "git"}]), true, Some("c1")))
        .reply(json!({"data": null, "errors": [{"message": "API rate limit exceeded"}]}));
    let endpoint = Endpoint::new(&transport, GRAPHQL_URL).unwrap();

    let mut user = user_with_repositories();
    endpoint.execute(&mut user).unwrap();

    let mut reported = Vec::new();
    let names: Vec<_> = endpoint
        .iterate(&mut user, "repositories", "name")
        .unwrap()
        .on_fetch_error(|err| {
            reported.push(err.graphql_errors().map(|errors| errors[0].message.clone()));
        })
        .collect();

    assert_eq!(names, vec![Some(json!("linux")), Some(json!("git"))]);
    assert_eq!(reported, [Some("API rate limit exceeded".to_owned())]);
    assert_eq!(transport.request_count(), 2);

    assert_eq!(child_names(&user), ["name", "repositories", "email"]);
    let cursor = user.child("repositories").unwrap().cursor().unwrap();
    assert_eq!(cursor.state(), CursorState::Terminal);
}

#[test]
fn test_transport_error_mid_iteration_ends_sequence() {
    let transport = ScriptedTransport::new();
    transport
        .reply(user_page(json!([{"name": "linux"}]), true, Some("c1")))
        .reply_with(502, json!("Bad Gateway"));
    let endpoint = Endpoint::new(&transport, GRAPHQL_URL).unwrap();

    let mut user = user_with_repositories();
    endpoint.execute(&mut user).unwrap();

    let mut statuses = Vec::new();
    let count = endpoint
        .iterate(&mut user, "repositories", "name")
        .unwrap()
        .on_fetch_error(|err| statuses.push(err.status()))
        .count();

    assert_eq!(count, 1);
    assert_eq!(statuses, [Some(502)]);
}

#[test]
fn test_null_item_and_missing_key_yield_none() {
    let transport = ScriptedTransport::new();
    transport.reply(user_page(
        json!([{"name": "linux"}, null, {"stars": 12}]),
        false,
        None,
    ));
    let endpoint = Endpoint::new(&transport, GRAPHQL_URL).unwrap();

    let mut user = user_with_repositories();
    endpoint.execute(&mut user).unwrap();

    let names: Vec<_> = endpoint
        .iterate(&mut user, "repositories", "name")
        .unwrap()
        .collect();
    assert_eq!(names, vec![Some(json!("linux")), None, None]);
    assert_eq!(transport.request_count(), 1);
}

#[test]
fn test_iterate_rows() {
    let transport = ScriptedTransport::new();
    transport
        .reply(user_page(json!([{"name": "linux", "stars": 3}, null]), true, Some("c1")))
        .reply(repositories_page(json!([{"name": "git", "stars": 2}]), false, None));
    let endpoint = Endpoint::new(&transport, GRAPHQL_URL).unwrap();

    let mut user = user_with_repositories();
    endpoint.execute(&mut user).unwrap();

    let rows: Vec<_> = endpoint
        .iterate_rows(&mut user, "repositories", "name", &["stars"])
        .unwrap()
        .collect();
    assert_eq!(
        rows,
        vec![
            vec![Some(json!("linux")), Some(json!(3))],
            vec![None, None],
            vec![Some(json!("git")), Some(json!(2))],
        ]
    );
}

#[test]
fn test_fresh_connection_fetches_first_page() {
    let transport = ScriptedTransport::new();
    transport.reply(repositories_page(json!([{"name": "linux"}]), false, None));
    let endpoint = Endpoint::new(&transport, GRAPHQL_URL).unwrap();

    let mut user = user_with_repositories();
    let mut names = endpoint.iterate(&mut user, "repositories", "name").unwrap();
    assert_eq!(names.next(), Some(Some(json!("linux"))));
    assert_eq!(names.next(), None);
    assert_eq!(names.fetch_count(), 1);
    drop(names);

    assert_eq!(
        transport.query(0),
        "query { user(login:\"torvalds\") { repositories(first:100) \
         { nodes { name stars } pageInfo { hasNextPage endCursor } } } } "
    );
    // The siblings were never fetched
    assert!(user.child("name").unwrap().value().is_none());
}

#[test]
fn test_reset_replays_current_page_without_fetching() {
    let transport = ScriptedTransport::new();
    transport.reply(user_page(json!([{"name": "a"}, {"name": "b"}]), false, None));
    let endpoint = Endpoint::new(&transport, GRAPHQL_URL).unwrap();

    let mut user = user_with_repositories();
    endpoint.execute(&mut user).unwrap();

    let mut names = endpoint.iterate(&mut user, "repositories", "name").unwrap();
    assert_eq!(names.by_ref().count(), 2);
    assert_eq!(names.next(), None);

    names.reset();
    assert_eq!(names.next(), Some(Some(json!("a"))));
    assert_eq!(names.fetch_count(), 0);
    drop(names);
    assert_eq!(transport.request_count(), 1);
}

#[test]
fn test_custom_page_size_and_bind_name() {
    let transport = ScriptedTransport::new();
    transport.reply(json!({
        "data": {
            "viewer": {
                "starredRepositories": {
                    "nodes": [{"name": "tokio"}],
                    "pageInfo": {"hasNextPage": false, "endCursor": "x"}
                }
            }
        }
    }));
    let endpoint = Endpoint::new(&transport, GRAPHQL_URL).unwrap();

    let mut viewer = QueryNode::new("viewer");
    viewer
        .add_child(QueryNode::connection("starredRepositories").with_page_size(25))
        .unwrap()
        .add_child("name")
        .unwrap();

    let names: Vec<_> = endpoint
        .iterate(&mut viewer, "starredRepositories", "name")
        .unwrap()
        .collect();
    assert_eq!(names, vec![Some(json!("tokio"))]);
    assert!(transport.query(0).contains("starredRepositories(first:25)"));
}

#[test]
fn test_unknown_connection() {
    let transport = ScriptedTransport::new();
    let endpoint = Endpoint::new(&transport, GRAPHQL_URL).unwrap();
    let mut user = user_with_repositories();

    assert!(matches!(
        endpoint.iterate(&mut user, "followers", "login"),
        Err(QueryError::UnknownConnection(ref field)) if field == "followers"
    ));
    // A plain field is not a connection
    assert!(matches!(
        endpoint.connection(&mut user, "name"),
        Err(QueryError::UnknownConnection(_))
    ));
    assert_eq!(transport.request_count(), 0);
}
