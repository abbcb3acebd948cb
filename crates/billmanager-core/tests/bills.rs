use std::sync::Arc;

use billmanager_core::{
    services, BillError, BillRequest, BillSearch, BillService, BillView, RegisterUserRequest,
    UserReference,
};
use billmanager_parser::BillCreationRequest;
use billmanager_repository::{BillStatus, InMemoryRepository, Role};
use chrono::NaiveDate;
use rust_decimal::Decimal;

fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
}

async fn setup() -> BillService {
    let service = services(Arc::new(InMemoryRepository::new()));
    for email in ["teste@gmail.com", "other@gmail.com"] {
        service
            .users()
            .register(&RegisterUserRequest {
                email: email.into(),
                role: Role::User,
            })
            .await
            .expect("register user");
    }
    service
}

fn creation(due: NaiveDate, amount: i64, description: &str) -> BillCreationRequest {
    BillCreationRequest {
        due_date: due,
        payment_date: due,
        amount: Decimal::new(amount, 2),
        description: description.to_string(),
        user_email: "teste@gmail.com".to_string(),
    }
}

async fn create(service: &BillService, due: NaiveDate, amount: i64, description: &str) -> BillView {
    service
        .create(&creation(due, amount, description))
        .await
        .expect("create bill")
}

fn today() -> NaiveDate {
    date(2025, 1, 1)
}

fn full_request(status: Option<BillStatus>) -> BillRequest {
    BillRequest {
        due_date: Some(date(2025, 3, 10)),
        payment_date: Some(date(2025, 3, 1)),
        amount: Some(Decimal::new(4990, 2)),
        description: Some(" Phone ".into()),
        bill_status: status,
        user: Some(UserReference {
            email: "teste@gmail.com".into(),
        }),
    }
}

#[tokio::test]
async fn registering_twice_is_rejected() {
    let service = setup().await;
    let users = service.users();

    let err = users
        .register(&RegisterUserRequest {
            email: " teste@gmail.com ".into(),
            role: Role::Admin,
        })
        .await
        .expect_err("duplicate");
    assert_eq!(err.to_string(), "User with email teste@gmail.com already exist.");

    let err = users
        .register(&RegisterUserRequest {
            email: "   ".into(),
            role: Role::User,
        })
        .await
        .expect_err("blank email");
    assert!(matches!(err, BillError::Validation(_)));

    assert!(users.exists("other@gmail.com").await.unwrap());
    assert!(!users.exists("ghost@gmail.com").await.unwrap());

    let user = users.find_by_email("teste@gmail.com").await.unwrap();
    assert_eq!(users.find_by_id(user.id).await.unwrap(), user);
    let err = users.find_by_id(404).await.expect_err("unknown id");
    assert_eq!(err.to_string(), "User with id 404 not exist.");
}

#[tokio::test]
async fn create_enforces_user_and_date_rules() {
    let service = setup().await;

    let mut request = creation(date(2024, 12, 5), 10000, "Electricity");
    request.user_email = "ghost@gmail.com".into();
    let err = service.create(&request).await.expect_err("unknown user");
    assert_eq!(err.to_string(), "User with email ghost@gmail.com not exist.");
    assert!(err.is_business_rule());

    let mut request = creation(date(2024, 12, 5), 10000, "Electricity");
    request.payment_date = date(2024, 12, 6);
    let err = service.create(&request).await.expect_err("late payment");
    assert!(matches!(err, BillError::PaymentDate));

    let bill = create(&service, date(2024, 12, 5), 10000, "Electricity").await;
    assert_eq!(bill.bill_status, BillStatus::Pending);
    assert_eq!(service.get_by_id(bill.id).await.unwrap(), bill);
}

#[tokio::test]
async fn paid_bills_cannot_be_modified() {
    let service = setup().await;
    let bill = create(&service, date(2024, 12, 5), 10000, "Electricity").await;

    let paid = service.update_status(bill.id, "paid").await.unwrap();
    assert_eq!(paid.bill_status, BillStatus::Paid);

    let err = service
        .update_status(bill.id, "PENDING")
        .await
        .expect_err("already paid");
    assert_eq!(
        err.to_string(),
        "This bill already paid, you can't modify the status of this bill."
    );

    let update = full_request(Some(BillStatus::Pending)).into_update_on(today()).unwrap();
    let err = service.update(bill.id, &update).await.expect_err("already paid");
    assert!(matches!(err, BillError::BillAlreadyPaid));
}

#[tokio::test]
async fn unknown_status_text_is_rejected() {
    let service = setup().await;
    let bill = create(&service, date(2024, 12, 5), 10000, "Electricity").await;

    let err = service
        .update_status(bill.id, "UPDATED")
        .await
        .expect_err("not a status");
    assert!(matches!(err, BillError::InvalidBillStatus(_)));
    assert_eq!(err.to_string(), "Value invalid to enum BillStatus: UPDATED");

    let err = service.update_status(999, "PAID").await.expect_err("no bill");
    assert_eq!(err.to_string(), "Bill with id 999 not exist.");
}

#[tokio::test]
async fn update_overwrites_bill_fields() {
    let service = setup().await;
    let bill = create(&service, date(2024, 12, 5), 10000, "Electricity").await;

    let mut request = full_request(Some(BillStatus::Paid));
    request.user = Some(UserReference {
        email: "other@gmail.com".into(),
    });
    let update = request.into_update_on(today()).unwrap();
    let updated = service.update(bill.id, &update).await.unwrap();

    assert_eq!(updated.id, bill.id);
    assert_eq!(updated.due_date, date(2025, 3, 10));
    assert_eq!(updated.payment_date, date(2025, 3, 1));
    assert_eq!(updated.amount, Decimal::new(4990, 2));
    assert_eq!(updated.description, "Phone");
    assert_eq!(updated.bill_status, BillStatus::Paid);
    assert_eq!(updated.user.email, "other@gmail.com");
}

#[test]
fn request_validation_collects_problems() {
    let err = BillRequest::default().into_creation_on(today()).expect_err("empty");
    let BillError::Validation(message) = err else {
        panic!("expected validation error");
    };
    assert!(message.contains("The field 'dueDate' is required"));
    assert!(message.contains("The field 'amount' is required"));
    assert!(message.contains("The 'user' field is required"));

    let mut request = full_request(None);
    request.amount = Some(Decimal::new(1, 1));
    request.description = Some("  ".into());
    let err = request.into_creation_on(today()).expect_err("too small");
    assert_eq!(
        err.to_string(),
        "The field 'amount' must have a value greater than 0.1; The field 'description' is required"
    );

    let err = full_request(None).into_update_on(today()).expect_err("status missing");
    assert_eq!(err.to_string(), "The field 'billStatus' is required");

    let mut request = full_request(None);
    request.due_date = Some(date(2000, 1, 2));
    request.payment_date = Some(today());
    let err = request.into_creation_on(today()).expect_err("dates not in the future");
    assert_eq!(
        err.to_string(),
        "The field 'dueDate' must be a date in the future; \
         The field 'paymentDate' must be a date in the future"
    );

    let mut request = full_request(Some(BillStatus::Pending));
    request.payment_date = Some(date(2024, 12, 31));
    let err = request.into_update_on(today()).expect_err("past payment date");
    assert_eq!(
        err.to_string(),
        "The field 'paymentDate' must be a date in the future"
    );

    let creation = full_request(None).into_creation_on(today()).unwrap();
    assert_eq!(creation.user_email, "teste@gmail.com");
    assert_eq!(creation.description, "Phone");
}

#[tokio::test]
async fn search_is_case_insensitive_and_paginated() {
    let service = setup().await;
    create(&service, date(2024, 1, 10), 100, "Electricity January").await;
    create(&service, date(2024, 2, 10), 200, "electricity February").await;
    create(&service, date(2024, 3, 10), 300, "ELECTRICITY March").await;
    create(&service, date(2024, 2, 20), 900, "Rent").await;

    let mut search = BillSearch::new(date(2024, 1, 1), "eLeCtRiCiTy");
    search.size = 2;
    let first = service.search(&search).await.unwrap();
    assert_eq!(first.total_elements, 3);
    assert_eq!(first.total_pages, 2);
    assert_eq!(first.page_number, 0);
    assert_eq!(first.page_size, 2);
    assert_eq!(first.content.len(), 2);

    search.page = 1;
    let second = service.search(&search).await.unwrap();
    assert_eq!(second.content.len(), 1);
    assert_eq!(second.content[0].description, "ELECTRICITY March");

    search.page = 0;
    search.sort = "amount".into();
    search.size = 10;
    let by_amount = service.search(&search).await.unwrap();
    assert_eq!(by_amount.content[0].amount, Decimal::new(100, 2));
}

#[tokio::test]
async fn search_rejects_bad_parameters_and_reports_empty_results() {
    let service = setup().await;
    create(&service, date(2024, 1, 10), 100, "Water").await;

    let err = service
        .search(&BillSearch::new(date(2024, 1, 1), "gas"))
        .await
        .expect_err("nothing matches");
    assert_eq!(
        err.to_string(),
        "Bills with 'dueDate' 2024-01-01 and 'description' gas not found."
    );

    let mut search = BillSearch::new(date(2024, 1, 1), "water");
    search.sort = "colour".into();
    assert!(matches!(
        service.search(&search).await,
        Err(BillError::Validation(_))
    ));

    let mut search = BillSearch::new(date(2024, 1, 1), "water");
    search.size = 0;
    assert!(matches!(
        service.search(&search).await,
        Err(BillError::Validation(_))
    ));
}

#[tokio::test]
async fn period_total_is_inclusive() {
    let service = setup().await;
    create(&service, date(2024, 1, 1), 1000, "a").await;
    create(&service, date(2024, 1, 31), 2550, "b").await;
    create(&service, date(2024, 2, 1), 9900, "c").await;

    let total = service
        .amount_by_period(date(2024, 1, 1), date(2024, 1, 31))
        .await
        .unwrap();
    assert_eq!(total.total, Decimal::new(3550, 2));
    assert_eq!(
        total.to_string(),
        "Total amount between 2024-01-01 and 2024-01-31 : 35.50"
    );

    let empty = service
        .amount_by_period(date(2030, 1, 1), date(2030, 1, 2))
        .await
        .unwrap();
    assert_eq!(empty.total, Decimal::ZERO);

    let err = service
        .amount_by_period(date(2024, 2, 1), date(2024, 1, 1))
        .await
        .expect_err("inverted period");
    assert!(matches!(err, BillError::Validation(_)));
}
