//! Repository connection queries.
//!
//! Each one aliases its connection to `items`, orders by `UPDATED_AT` ascending
//! and asks for the caller's remaining quota alongside the page.

pub const ISSUES_QUERY: &str = r#"
query Issues($owner: String!, $name: String!, $pageSize: Int!, $cursor: String) {
  rateLimit { remaining resetAt }
  repository(owner: $owner, name: $name) {
    items: issues(first: $pageSize, after: $cursor, orderBy: {field: UPDATED_AT, direction: ASC}) {
      nodes {
        id
        number
        title
        state
        url
        body
        createdAt
        updatedAt
        author { login }
        labels(first: 50) { nodes { name } }
        comments { totalCount }
      }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#;

pub const PULL_REQUESTS_QUERY: &str = r#"
query PullRequests($owner: String!, $name: String!, $pageSize: Int!, $cursor: String) {
  rateLimit { remaining resetAt }
  repository(owner: $owner, name: $name) {
    items: pullRequests(first: $pageSize, after: $cursor, orderBy: {field: UPDATED_AT, direction: ASC}) {
      nodes {
        id
        number
        title
        state
        url
        body
        isDraft
        mergedAt
        createdAt
        updatedAt
        author { login }
        labels(first: 50) { nodes { name } }
        comments { totalCount }
      }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#;

pub const DISCUSSIONS_QUERY: &str = r#"
query Discussions($owner: String!, $name: String!, $pageSize: Int!, $cursor: String) {
  rateLimit { remaining resetAt }
  repository(owner: $owner, name: $name) {
    items: discussions(first: $pageSize, after: $cursor, orderBy: {field: UPDATED_AT, direction: ASC}) {
      nodes {
        id
        number
        title
        url
        body
        closed
        category { name }
        createdAt
        updatedAt
        author { login }
        labels(first: 50) { nodes { name } }
        comments { totalCount }
      }
      pageInfo { endCursor hasNextPage }
    }
  }
}
"#;
