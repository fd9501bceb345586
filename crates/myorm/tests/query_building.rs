#![allow(dead_code)]

use myorm::{
    Condition, FieldDef, FromRow, Model, Op, OrmError, QueryBuilder, Row, RowMap, Value, Where,
    delete_model_sql, delete_sql, find_one_model_sql, insert_models_sql, insert_sql,
    update_model_sql, update_sql,
};

#[derive(Debug, Default, PartialEq)]
struct Account {
    id: u64,
    email: String,
    plan: Option<String>,
}

impl Model for Account {
    const TABLE: &'static str = "account";

    fn fields() -> &'static [FieldDef<Self>] {
        static FIELDS: &[FieldDef<Account>] = &[
            FieldDef {
                column: "id",
                required: true,
                primary: true,
                get: |m| Value::from(m.id),
                set: |m, v| {
                    m.id = mysql_async::from_value_opt(v)
                        .map_err(|e| OrmError::decode("id", e.to_string()))?;
                    Ok(())
                },
            },
            FieldDef {
                column: "email",
                required: true,
                primary: false,
                get: |m| Value::from(m.email.clone()),
                set: |m, v| {
                    m.email = mysql_async::from_value_opt(v)
                        .map_err(|e| OrmError::decode("email", e.to_string()))?;
                    Ok(())
                },
            },
            FieldDef {
                column: "plan",
                required: false,
                primary: false,
                get: |m| Value::from(m.plan.clone()),
                set: |m, v| {
                    m.plan = mysql_async::from_value_opt(v)
                        .map_err(|e| OrmError::decode("plan", e.to_string()))?;
                    Ok(())
                },
            },
        ];
        FIELDS
    }
}

#[test]
fn select_with_mixed_conditions() {
    let mut args = Vec::new();
    let sql = QueryBuilder::new()
        .select(&["id", "email"])
        .from("account")
        .and_where(
            Condition::all()
                .field("plan", Op::in_list(vec!["pro", "team"]))
                .field("created_at", Op::between("2026-01-01", "2026-12-31")),
        )
        .or_where(Condition::all().field("id", Op::eq(1)))
        .order_by(&["id DESC"])
        .limit(25)
        .sql(&mut args);

    assert_eq!(
        sql,
        "SELECT id,email FROM account WHERE (plan IN(?,?) AND created_at BETWEEN ? AND ?) \
         OR (id = ?) ORDER BY id DESC LIMIT 0,25"
    );
    assert_eq!(args.len(), 5);
}

#[test]
fn empty_conditions_vanish_from_the_chain() {
    let mut args = Vec::new();
    let sql = QueryBuilder::new()
        .from("account")
        .and_where(Condition::all().field("id", Op::in_list(Vec::<i32>::new())))
        .or_where(Condition::all().field("email", Op::like("%@example.com")))
        .sql(&mut args);

    assert_eq!(sql, "SELECT * FROM account WHERE (email LIKE ?)");
    assert_eq!(args.len(), 1);
}

#[test]
fn builder_round_trip_through_the_free_list() {
    let qb = QueryBuilder::acquire()
        .from("account")
        .and_where(Condition::all().field("id", Op::eq(1)))
        .limit(5);
    let mut args = Vec::new();
    assert_eq!(
        qb.sql(&mut args),
        "SELECT * FROM account WHERE (id = ?) LIMIT 0,5"
    );
    QueryBuilder::release(qb);

    let qb = QueryBuilder::acquire().from("account");
    let mut args = Vec::new();
    assert_eq!(qb.sql(&mut args), "SELECT * FROM account");
    assert!(args.is_empty());
    QueryBuilder::release(qb);
}

#[test]
fn adhoc_write_statements() {
    let mut args = Vec::new();
    let rows = vec![
        Row::new().set("email", "a@example.com").set("plan", "pro"),
        Row::new().set("email", "b@example.com"),
    ];
    let sql = insert_sql(&mut args, "account", &rows).unwrap();
    assert_eq!(sql, "INSERT INTO account(email,plan)VALUES(?,?),(?,?)");
    assert_eq!(args[3], Value::NULL);

    let mut args = Vec::new();
    let where_ = Where::new(Condition::all().field("id", Op::eq(9)));
    let sql = update_sql(&mut args, "account", &Row::new().set("plan", "free"), &where_).unwrap();
    assert_eq!(sql, "UPDATE account SET plan=? WHERE (id = ?)");

    let mut args = Vec::new();
    let sql = delete_sql(&mut args, "account", &where_);
    assert_eq!(sql, "DELETE FROM account WHERE (id = ?)");
}

#[test]
fn model_statement_generation() {
    let mut args = Vec::new();
    let mut accounts = vec![Account {
        id: 1,
        email: "a@example.com".into(),
        plan: None,
    }];
    let sql = insert_models_sql(&mut args, &mut accounts).unwrap();
    assert_eq!(sql, "INSERT INTO `account`(`id`,`email`)VALUES(?,?)");

    let mut args = Vec::new();
    let sql = update_model_sql(&mut args, &mut accounts[0]).unwrap();
    assert_eq!(sql, "UPDATE `account` SET `email`=? WHERE (`id` = ?)");

    let mut args = Vec::new();
    let sql = delete_model_sql(&mut args, &accounts[0]).unwrap();
    assert_eq!(sql, "DELETE FROM `account` WHERE (`id` = ?)");

    let mut args = Vec::new();
    let sql = find_one_model_sql::<Account>(&mut args, Condition::all().field("id", Op::eq(1)));
    assert_eq!(sql, "SELECT * FROM `account` WHERE (id = ?) LIMIT 1");
}

#[test]
fn models_hydrate_from_rows() {
    let row = RowMap::from_pairs(vec![
        ("id".to_string(), Value::from(3u64)),
        ("email".to_string(), Value::from("c@example.com")),
        ("plan".to_string(), Value::NULL),
    ]);
    let account = Account::from_row(&row).unwrap();
    assert_eq!(
        account,
        Account {
            id: 3,
            email: "c@example.com".into(),
            plan: None,
        }
    );
}
