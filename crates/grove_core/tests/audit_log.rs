use grove_core::db::open_db_in_memory;
use grove_core::{
    add_ecosystem, add_project, get_transaction, list_operations, list_transactions,
    operations_of, EntityKind, OpType, OperationQuery, TransactionQuery, TransactionsLog,
};
use serde_json::json;

fn setup() -> rusqlite::Connection {
    open_db_in_memory().unwrap()
}

#[test]
fn open_transaction_is_recorded_open_and_closes_on_commit() {
    let conn = setup();

    let trxl = TransactionsLog::open(&conn, "add_ecosystem", Some("jsmith")).unwrap();
    let opened = trxl.transaction().clone();
    assert!(!opened.is_closed);
    assert_eq!(opened.closed_at, None);
    assert_eq!(opened.name, "add_ecosystem");
    assert_eq!(opened.authored_by.as_deref(), Some("jsmith"));
    assert_eq!(opened.tuid.len(), 32);

    add_ecosystem(&trxl, "Example", None, None).unwrap();
    let closed = trxl.close().unwrap();
    assert!(closed.is_closed);
    assert!(closed.closed_at.unwrap() >= closed.created_at);

    let stored = get_transaction(&conn, &closed.tuid).unwrap().unwrap();
    assert_eq!(stored, closed);
}

#[test]
fn abandoned_unit_of_work_leaves_no_rows() {
    let conn = setup();

    let trxl = TransactionsLog::open(&conn, "add_ecosystem", None).unwrap();
    add_ecosystem(&trxl, "Example", None, None).unwrap();
    trxl.abandon().unwrap();

    assert!(list_transactions(&conn, &TransactionQuery::default())
        .unwrap()
        .is_empty());
    assert!(list_operations(&conn, &OperationQuery::default())
        .unwrap()
        .is_empty());

    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM ecosystems;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn dropping_the_log_discards_the_unit_of_work() {
    let conn = setup();

    {
        let trxl = TransactionsLog::open(&conn, "add_ecosystem", None).unwrap();
        add_ecosystem(&trxl, "Example", None, None).unwrap();
        // No close: the storage transaction rolls back on drop.
    }

    assert!(list_transactions(&conn, &TransactionQuery::default())
        .unwrap()
        .is_empty());
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM ecosystems;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
}

#[test]
fn one_transaction_aggregates_multiple_operations() {
    let conn = setup();

    let trxl = TransactionsLog::open(&conn, "bootstrap-registry", Some("admin")).unwrap();
    let eco = add_ecosystem(&trxl, "Eco-example", None, None).unwrap();
    let root = add_project(&trxl, &eco, "root", None, None).unwrap();
    add_project(&trxl, &eco, "child", None, Some(&root)).unwrap();
    let trx = trxl.close().unwrap();

    let operations = operations_of(&conn, &trx.tuid).unwrap();
    assert_eq!(operations.len(), 3);
    assert!(operations.iter().all(|op| op.tuid == trx.tuid));

    let ecosystems = operations
        .iter()
        .filter(|op| op.entity_type == EntityKind::Ecosystem)
        .count();
    assert_eq!(ecosystems, 1);
    for target in ["root", "child"] {
        assert!(operations
            .iter()
            .any(|op| op.entity_type == EntityKind::Project && op.target == target));
    }
}

#[test]
fn operation_args_round_trip_through_json() {
    let conn = setup();

    let trxl = TransactionsLog::open(&conn, "add_ecosystem", None).unwrap();
    add_ecosystem(&trxl, "Example", Some("Example title"), None).unwrap();
    let trx = trxl.close().unwrap();

    let op = &operations_of(&conn, &trx.tuid).unwrap()[0];
    assert_eq!(
        op.args,
        json!({
            "name": "Example",
            "title": "Example title",
            "description": null,
        })
    );

    let raw: String = conn
        .query_row(
            "SELECT args FROM operations WHERE ouid = ?1;",
            [&op.ouid],
            |row| row.get(0),
        )
        .unwrap();
    let reparsed: serde_json::Value = serde_json::from_str(&raw).unwrap();
    assert_eq!(reparsed, op.args);
}

#[test]
fn transaction_listing_filters() {
    let conn = setup();

    let trxl = TransactionsLog::open(&conn, "add_ecosystem", Some("alice")).unwrap();
    let eco = add_ecosystem(&trxl, "Eco-a", None, None).unwrap();
    let first = trxl.close().unwrap();

    let trxl = TransactionsLog::open(&conn, "add_project", Some("bob")).unwrap();
    add_project(&trxl, &eco, "proj-a", None, None).unwrap();
    let second = trxl.close().unwrap();

    let by_name = list_transactions(
        &conn,
        &TransactionQuery {
            name: Some("add_project".to_string()),
            ..TransactionQuery::default()
        },
    )
    .unwrap();
    assert_eq!(by_name.len(), 1);
    assert_eq!(by_name[0].tuid, second.tuid);

    let by_author = list_transactions(
        &conn,
        &TransactionQuery {
            authored_by: Some("alice".to_string()),
            ..TransactionQuery::default()
        },
    )
    .unwrap();
    assert_eq!(by_author.len(), 1);
    assert_eq!(by_author[0].tuid, first.tuid);

    let closed = list_transactions(
        &conn,
        &TransactionQuery {
            is_closed: Some(true),
            ..TransactionQuery::default()
        },
    )
    .unwrap();
    assert_eq!(closed.len(), 2);

    let since_second = list_transactions(
        &conn,
        &TransactionQuery {
            from_date: Some(second.created_at),
            ..TransactionQuery::default()
        },
    )
    .unwrap();
    assert!(since_second.iter().any(|trx| trx.tuid == second.tuid));

    let none = list_transactions(
        &conn,
        &TransactionQuery {
            to_date: Some(first.created_at - 1),
            ..TransactionQuery::default()
        },
    )
    .unwrap();
    assert!(none.is_empty());
}

#[test]
fn operation_listing_filters() {
    let conn = setup();

    let trxl = TransactionsLog::open(&conn, "bootstrap-registry", None).unwrap();
    let eco = add_ecosystem(&trxl, "Eco-a", None, None).unwrap();
    add_project(&trxl, &eco, "proj-a", None, None).unwrap();
    let trx = trxl.close().unwrap();

    let adds = list_operations(
        &conn,
        &OperationQuery {
            op_type: Some(OpType::Add),
            ..OperationQuery::default()
        },
    )
    .unwrap();
    assert_eq!(adds.len(), 2);

    let projects = list_operations(
        &conn,
        &OperationQuery {
            entity_type: Some(EntityKind::Project),
            ..OperationQuery::default()
        },
    )
    .unwrap();
    assert_eq!(projects.len(), 1);
    assert_eq!(projects[0].target, "proj-a");

    let by_ouid = list_operations(
        &conn,
        &OperationQuery {
            ouid: Some(projects[0].ouid.clone()),
            ..OperationQuery::default()
        },
    )
    .unwrap();
    assert_eq!(by_ouid.len(), 1);

    let in_trx = list_operations(
        &conn,
        &OperationQuery {
            tuid: Some(trx.tuid.clone()),
            ..OperationQuery::default()
        },
    )
    .unwrap();
    assert_eq!(in_trx.len(), 2);
}

#[test]
fn failed_validation_inside_a_batch_discards_earlier_operations() {
    let conn = setup();

    let trxl = TransactionsLog::open(&conn, "bootstrap-registry", None).unwrap();
    add_ecosystem(&trxl, "Eco-a", None, None).unwrap();
    let err = add_ecosystem(&trxl, "bad name", None, None).unwrap_err();
    assert!(matches!(err, grove_core::RegistryError::InvalidValue(_)));
    trxl.abandon().unwrap();

    // All-or-nothing: the earlier successful add is discarded too.
    let count: i64 = conn
        .query_row("SELECT COUNT(*) FROM ecosystems;", [], |row| row.get(0))
        .unwrap();
    assert_eq!(count, 0);
    assert!(list_operations(&conn, &OperationQuery::default())
        .unwrap()
        .is_empty());
}
