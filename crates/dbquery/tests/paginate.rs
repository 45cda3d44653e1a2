mod common;

use common::Recorder;
use dbquery::prelude::*;
use dbquery::{PaginationConfig, QueryError};

fn planets() -> dbquery::SelectQb {
    qb::select(Ident::table("planets").alias("p"))
        .left_join(Ident::table("moons").alias("m"))
        .on(Ident::column("planet_id").eq_col(&Ident::column("id").of("p")))
        .filter(Ident::column("kind").of("p").eq("rocky"))
        .sort(&[Ident::column("name").of("p")], Direction::Asc)
}

#[tokio::test]
async fn paginate_runs_count_and_rows() {
    let conn = Recorder::new();
    let page = planets()
        .paginate::<i64>(&conn, PageRequest::new(2, 10))
        .await
        .unwrap();

    assert!(page.items.is_empty());
    assert_eq!(page.metadata.page, 2);
    assert_eq!(page.metadata.per, 10);
    assert_eq!(page.metadata.total, 0);
    assert_eq!(page.metadata.page_count(), 1);

    let statements = conn.statements();
    assert_eq!(statements.len(), 2);

    let count = statements
        .iter()
        .find(|sql| sql.contains("count("))
        .expect("count query");
    assert_eq!(
        count,
        r#"SELECT count("p".*) FROM "planets" AS "p" WHERE "p"."kind" = $1;"#
    );

    let rows = statements
        .iter()
        .find(|sql| sql.contains("LIMIT"))
        .expect("rows query");
    assert!(rows.ends_with(r#"ORDER BY "p"."name" ASC LIMIT 10 OFFSET 10;"#));
    assert!(rows.contains("LEFT JOIN"));
    assert_eq!(conn.params_for("LIMIT"), Some(1));
}

#[tokio::test]
async fn paginate_counts_rows_when_fields_are_selected() {
    let conn = Recorder::new();
    planets()
        .field(Ident::column("name").of("p"))
        .field(Ident::column("mass").of("p").alias("m"))
        .paginate::<i64>(&conn, PageRequest::new(1, 20))
        .await
        .unwrap();

    let statements = conn.statements();
    let count = statements
        .iter()
        .find(|sql| sql.contains("count("))
        .expect("count query");
    assert_eq!(
        count,
        r#"SELECT count("p".*) FROM "planets" AS "p" WHERE "p"."kind" = $1;"#
    );

    let rows = statements
        .iter()
        .find(|sql| sql.contains("LIMIT"))
        .expect("rows query");
    assert!(rows.starts_with(r#"SELECT "p"."name", "p"."mass" AS "m" FROM "#));
}

#[tokio::test]
async fn paginate_clamps_request() {
    let conn = Recorder::new();
    let config = PaginationConfig::new().with_max_per(50);
    let page = planets()
        .paginate_with::<i64>(&conn, PageRequest::new(0, 500), &config)
        .await
        .unwrap();
    assert_eq!(page.metadata.page, 1);
    assert_eq!(page.metadata.per, 50);
    assert!(
        conn.statements()
            .iter()
            .any(|sql| sql.ends_with("LIMIT 50 OFFSET 0;"))
    );
}

#[tokio::test]
async fn paginate_fails_when_either_query_fails() {
    let conn = Recorder::failing_on("count(");
    let err = planets()
        .paginate::<i64>(&conn, PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Other(_)));

    let conn = Recorder::failing_on("LIMIT");
    let err = planets()
        .paginate::<i64>(&conn, PageRequest::default())
        .await
        .unwrap_err();
    assert!(matches!(err, QueryError::Other(_)));
}

#[tokio::test]
async fn build_errors_never_reach_the_executor() {
    let conn = Recorder::new();
    let err = qb::select(Ident::table("t"))
        .on(Ident::column("id").eq(1_i64))
        .fetch_all::<i64>(&conn)
        .await
        .unwrap_err();
    assert!(err.is_build());
    assert!(conn.statements().is_empty());
}

#[tokio::test]
async fn aggregates_default_without_rows() {
    let conn = Recorder::new();
    let qb = qb::select(Ident::table("orders"))
        .filter(Ident::column("status").eq("paid"))
        .limit(5);

    let total: i64 = qb.sum(&conn, &[Ident::column("amount")]).await.unwrap();
    assert_eq!(total, 0);
    let n = qb.count(&conn, &[]).await.unwrap();
    assert_eq!(n, 0);

    let statements = conn.statements();
    assert_eq!(
        statements[0],
        r#"SELECT sum("amount") FROM "orders" WHERE "status" = $1;"#
    );
    assert_eq!(
        statements[1],
        r#"SELECT count("orders".*) FROM "orders" WHERE "status" = $1;"#
    );
}
