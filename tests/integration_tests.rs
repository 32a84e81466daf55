use chrono::{Datelike, Days, NaiveDate};
use stay_ledger::*;
use std::collections::BTreeSet;

fn d(y: i32, m: u32, day: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, day).unwrap()
}

fn portfolio() -> LedgerSnapshot {
    let stays = vec![
        Stay::new(1, 1, d(2024, 1, 10), d(2024, 1, 13), 300.0)
            .unwrap()
            .with_guest("Ana")
            .with_platform(Platform::Airbnb),
        Stay::new(2, 1, d(2024, 1, 28), d(2024, 2, 4), 700.0)
            .unwrap()
            .with_guest("Bruno")
            .with_platform(Platform::Booking),
        Stay::new(3, 2, d(2024, 3, 5), d(2024, 3, 5), 150.0)
            .unwrap()
            .with_guest("Carla"),
        Stay::new(4, 3, d(2023, 12, 30), d(2024, 1, 2), 900.0)
            .unwrap()
            .with_guest("Davi")
            .with_platform(Platform::Airbnb)
            .with_payment_status(PaymentStatus::Paid),
    ];
    let expenses = vec![
        Expense {
            id: 1,
            unit_id: 1,
            date: d(2024, 1, 5),
            expense_type: ExpenseType::CondoFee,
            amount: 400.0,
            description: "January condo".to_string(),
        },
        Expense {
            id: 2,
            unit_id: 2,
            date: d(2024, 6, 15),
            expense_type: ExpenseType::Electricity,
            amount: 120.0,
            description: String::new(),
        },
        Expense {
            id: 3,
            unit_id: 3,
            date: d(2023, 12, 1),
            expense_type: ExpenseType::Internet,
            amount: 99.9,
            description: String::new(),
        },
    ];

    LedgerSnapshot::new(
        vec![
            Unit::new(1, "Beach House").with_administration(20.0),
            Unit::new(2, "City Loft"),
            Unit::new(3, "Mountain Cabin").with_administration(10.0),
        ],
        stays,
        expenses,
        vec![],
    )
}

#[test]
fn test_allocation_scenarios() {
    let stay = allocate(d(2024, 1, 10), d(2024, 1, 13), 300.0, d(2024, 1, 11), d(2024, 1, 11));
    assert!((stay.nightly_rate - 100.0).abs() < 1e-9);
    assert_eq!(stay.nights_in_window, 1);
    assert!((stay.value_in_window - 100.0).abs() < 1e-9);

    let full = allocate(d(2024, 1, 10), d(2024, 1, 13), 300.0, d(2024, 1, 1), d(2024, 1, 31));
    assert_eq!(full.nights_in_window, 3);

    let day_use = allocate(d(2024, 3, 5), d(2024, 3, 5), 150.0, d(2024, 3, 1), d(2024, 3, 31));
    assert_eq!(day_use.nights_in_window, 1);
    assert!((day_use.value_in_window - 150.0).abs() < 1e-9);

    let reversed_window = allocate(d(2024, 3, 5), d(2024, 3, 8), 150.0, d(2024, 3, 31), d(2024, 3, 1));
    assert_eq!(reversed_window.nights_in_window, 0);
    assert_eq!(reversed_window.value_in_window, 0.0);
}

#[test]
fn test_night_count_and_conservation() {
    let snapshot = portfolio();

    for stay in &snapshot.stays {
        let span_window = DateWindow::new(stay.check_in(), stay.span.last_night()).unwrap();
        let allocation = allocate_stay(stay, &span_window);
        assert_eq!(allocation.nights_in_window, stay.span.night_count());
        assert!(
            (allocation.nightly_rate * stay.span.night_count() as f64 - stay.total_price).abs()
                < 1e-9
        );

        let wide = DateWindow::new(d(2023, 1, 1), d(2025, 12, 31)).unwrap();
        let per_day: f64 = nightly_breakdown(stay, &wide).iter().map(|n| n.value).sum();
        assert!((per_day - stay.total_price).abs() < 1e-9);
    }
}

#[test]
fn test_day_use_outside_window() {
    let stay = Stay::new(1, 1, d(2024, 3, 5), d(2024, 3, 4), 150.0).unwrap();
    assert!(stay.is_day_use());

    let april = DateWindow::for_month(2024, 4).unwrap();
    let allocation = allocate_stay(&stay, &april);
    assert_eq!(allocation.nights_in_window, 0);
    assert_eq!(allocation.value_in_window, 0.0);

    assert!(Stay::new(2, 1, d(2024, 3, 5), d(2024, 3, 1), 150.0).is_err());
    assert!(Stay::new(3, 1, d(2024, 3, 5), d(2024, 3, 6), -1.0).is_err());
}

#[test]
fn test_grid_splits_value_across_months() {
    let snapshot = portfolio();
    let config = LedgerConfig::default();
    let dashboard = RentalDashboard::new(&snapshot, &config).unwrap();

    let january = DateWindow::for_month(2024, 1).unwrap();
    let grid = dashboard.occupancy_grid(&january, &DashboardFilter::default());

    // Beach House: 300 in full plus 4 of 7 nights at 100. Cabin: 1 of 3 nights at 300.
    let beach = grid.row(1).unwrap();
    assert!((beach.total - 700.0).abs() < 1e-9);
    assert!((beach.administrator_total - 140.0).abs() < 1e-9);
    let cabin = grid.row(3).unwrap();
    assert!((cabin.total - 300.0).abs() < 1e-9);
    assert!((grid.total - 1000.0).abs() < 1e-9);
    assert!((grid.net_total - 870.0).abs() < 1e-9);
    assert!((grid.administrator_total - 170.0).abs() < 1e-9);

    assert_eq!(grid.cell(3, d(2024, 1, 1)).unwrap().marker, Marker::Occupied);
    assert_eq!(grid.cell(3, d(2024, 1, 2)).unwrap().marker, Marker::CheckOut);
    assert_eq!(grid.cell(1, d(2024, 1, 13)).unwrap().marker, Marker::CheckOut);
    assert_eq!(grid.cell(2, d(2024, 1, 13)).unwrap().marker, Marker::Empty);

    let february = DateWindow::for_month(2024, 2).unwrap();
    let grid = dashboard.occupancy_grid(&february, &DashboardFilter::default());
    assert!((grid.row(1).unwrap().total - 300.0).abs() < 1e-9);
}

#[test]
fn test_occupancy_rate_bounds() {
    let snapshot = portfolio();
    let config = LedgerConfig::default();
    let dashboard = RentalDashboard::new(&snapshot, &config).unwrap();

    let quiet = DateWindow::for_month(2024, 8).unwrap();
    let grid = dashboard.occupancy_grid(&quiet, &DashboardFilter::default());
    assert_eq!(grid.occupancy_rate, 0.0);
    assert_eq!(grid.occupied_nights, 0);

    let busy = DateWindow::new(d(2024, 1, 10), d(2024, 1, 12)).unwrap();
    let grid = dashboard.occupancy_grid(&busy, &DashboardFilter::single_unit(1));
    assert_eq!(grid.occupancy_rate, 100.0);

    let year = parse_period_string("2024").unwrap();
    let grid = dashboard.occupancy_grid(&year, &DashboardFilter::default());
    assert!(grid.occupancy_rate > 0.0 && grid.occupancy_rate <= 100.0);

    let empty = LedgerSnapshot::default();
    let dashboard = RentalDashboard::new(&empty, &config).unwrap();
    let grid = dashboard.occupancy_grid(&year, &DashboardFilter::default());
    assert!(grid.rows.is_empty());
    assert_eq!(grid.occupancy_rate, 0.0);
}

#[test]
fn test_monthly_zero_fill() {
    let snapshot = portfolio();
    let config = LedgerConfig::default();
    let dashboard = RentalDashboard::new(&snapshot, &config).unwrap();

    let series = dashboard.monthly_series(&PeriodFilter::for_year(2024));
    assert_eq!(series.len(), 12);

    let june = &series[5];
    assert_eq!(june.month, 6);
    assert_eq!(june.label, "Jun");
    assert_eq!(june.revenue, 0.0);
    assert!((june.expense - 120.0).abs() < 1e-9);
    assert!((june.profit + 120.0).abs() < 1e-9);

    let check_in_total: f64 = snapshot
        .stays
        .iter()
        .filter(|s| s.check_in().year() == 2024)
        .map(|s| s.total_price)
        .sum();
    let series_total: f64 = series.iter().map(|m| m.revenue).sum();
    assert!((series_total - check_in_total).abs() < 1e-9);

    let empty = PeriodFilter::for_year(2030);
    assert!(dashboard
        .monthly_series(&empty)
        .iter()
        .all(|m| m.revenue == 0.0 && m.expense == 0.0));
}

#[test]
fn test_unit_year_pivot_and_years() {
    let snapshot = portfolio();
    let config = LedgerConfig::default();
    let dashboard = RentalDashboard::new(&snapshot, &config).unwrap();

    assert_eq!(dashboard.available_years(), vec![2023, 2024]);

    let pivot = dashboard.unit_year_pivot(&DashboardFilter::default());
    assert_eq!(pivot.years, vec![2023, 2024]);
    let cabin = pivot.rows.iter().find(|r| r.unit_id == 3).unwrap();
    assert!((cabin.years[&2023].revenue - 900.0).abs() < 1e-9);
    assert!((cabin.years[&2023].profit - 800.1).abs() < 1e-9);
    assert!((pivot.grand_total.revenue - 2050.0).abs() < 1e-9);
    assert!((pivot.grand_total.expense - 619.9).abs() < 1e-9);
}

#[test]
fn test_commission_scenario() {
    let snapshot = LedgerSnapshot::new(
        vec![Unit::new(1, "Beach House").with_administration(20.0)],
        vec![Stay::new(1, 1, d(2024, 5, 1), d(2024, 5, 6), 1000.0).unwrap()],
        vec![],
        vec![],
    );
    let config = LedgerConfig::default();
    let dashboard = RentalDashboard::new(&snapshot, &config).unwrap();

    let report = dashboard
        .commission_report(&CommissionFilter {
            month: Some(5),
            ..CommissionFilter::for_year(2024)
        })
        .unwrap();
    assert_eq!(report.nights, 5);
    assert!((report.gross_value - 1000.0).abs() < 1e-9);
    assert!((report.net_value - 870.0).abs() < 1e-9);
    assert!((report.commission_value - 174.0).abs() < 1e-9);
}

#[test]
fn test_commission_never_negative() {
    let snapshot = portfolio();
    let config = LedgerConfig::default();
    let dashboard = RentalDashboard::new(&snapshot, &config).unwrap();

    let report = dashboard
        .commission_report(&CommissionFilter::for_year(2024))
        .unwrap();
    assert!(report.settlements.iter().all(|s| s.commission_value >= 0.0));
    assert!(report.settlements.iter().all(|s| s.unit_id != 2));

    // Cabin contributes its New Year's night only.
    let cabin = report.settlements.iter().find(|s| s.unit_id == 3).unwrap();
    assert_eq!(cabin.nights_in_window, 1);
    assert!((cabin.commission_value - 300.0 * 0.87 * 0.1).abs() < 1e-9);
}

#[test]
fn test_money_parsing() {
    assert!((parse_amount("R$ 1.234,56") - 1234.56).abs() < 1e-9);
    assert!((parse_amount("(1.234,56)") + 1234.56).abs() < 1e-9);
    assert!((parse_amount("1234.56") - 1234.56).abs() < 1e-9);
    assert_eq!(parse_amount(""), 0.0);
    assert_eq!(parse_amount("n/a"), 0.0);
}

#[test]
fn test_import_then_export_grid() -> anyhow::Result<()> {
    let mut snapshot = portfolio();
    let csv = "Unidade;Check-in;Check-out;Hóspede;Valor;Plataforma;Status\n\
               city loft;01/04/2024;04/04/2024;Eva;R$ 450,00;Airbnb;Pago\n\
               Unknown Place;01/04/2024;02/04/2024;Fábio;100;;\n\
               City Loft;31/04/2024;02/05/2024;Gil;100;;\n";

    let report = StayImporter::new(&snapshot.units).import_str(csv)?;
    assert_eq!(report.inserted_count(), 1);
    assert_eq!(report.skipped_count(), 2);
    assert_eq!(report.skipped[0].line, 3);

    let ids = snapshot.apply_import(report, ImportMode::Append);
    assert_eq!(ids, vec![5]);

    let config = LedgerConfig::default();
    let dashboard = RentalDashboard::new(&snapshot, &config)?;
    let window = DateWindow::new(d(2024, 4, 1), d(2024, 4, 4))?;
    let csv = dashboard.export_grid_csv(&window, &DashboardFilter::single_unit(2))?;
    let lines: Vec<&str> = csv.lines().collect();

    assert_eq!(lines.len(), 3);
    assert_eq!(
        lines[0],
        ";01/04;02/04;03/04;04/04;Total;Net (-13%);Administrator"
    );
    assert_eq!(
        lines[1],
        "City Loft;🟧 150.00;🟧 150.00;🟧 150.00;◧;450.00;391.50;0.00"
    );
    assert!(lines[2].starts_with("Total;150.00;150.00;150.00;;450.00"));
    Ok(())
}

#[test]
fn test_missing_required_columns() {
    let units = vec![Unit::new(1, "Loft")];
    let err = import_stays_csv("guest;amount\nAna;100\n", &units).unwrap_err();
    match err {
        StayLedgerError::MissingColumns(columns) => {
            assert_eq!(columns, vec!["unit", "check-in", "check-out"])
        }
        other => panic!("unexpected error {:?}", other),
    }
}

#[test]
fn test_storage_rows_to_reports() {
    let units = vec![
        UnitRecord {
            id: 1,
            name: "Beach House".to_string(),
            administration_flag: "Sim".to_string(),
            administration_percentage: Some("abc".to_string()),
            ..Default::default()
        },
        UnitRecord {
            id: 2,
            name: "City Loft".to_string(),
            administration_flag: "Sim".to_string(),
            administration_percentage: Some("15".to_string()),
            ..Default::default()
        },
    ];
    let stays = vec![
        StayRecord {
            id: 1,
            unit_id: 1,
            check_in: d(2024, 7, 1),
            check_out: d(2024, 7, 3),
            guest: "Ana".to_string(),
            total_price: 200.0,
            platform: "Direto".to_string(),
            payment_status: String::new(),
        },
        StayRecord {
            id: 2,
            unit_id: 2,
            check_in: d(2024, 7, 10),
            check_out: d(2024, 7, 12),
            guest: "Bia".to_string(),
            total_price: 400.0,
            platform: "Airbnb".to_string(),
            payment_status: "Pago".to_string(),
        },
        StayRecord {
            id: 3,
            unit_id: 4,
            check_in: d(2024, 7, 10),
            check_out: d(2024, 7, 12),
            guest: String::new(),
            total_price: 400.0,
            platform: String::new(),
            payment_status: String::new(),
        },
    ];

    let (snapshot, load) = LedgerSnapshot::from_records(units, stays, vec![], vec![]);
    assert_eq!(load.orphan_stays, 1);
    assert_eq!(snapshot.stays.len(), 2);

    let config = LedgerConfig::default();
    let dashboard = RentalDashboard::new(&snapshot, &config).unwrap();
    let report = dashboard
        .commission_report(&CommissionFilter {
            month: Some(7),
            ..CommissionFilter::for_year(2024)
        })
        .unwrap();

    // A non-numeric percentage reads as zero commission, never an error.
    let beach = report.settlements.iter().find(|s| s.unit_id == 1).unwrap();
    assert_eq!(beach.commission_value, 0.0);
    assert!((report.commission_value - 400.0 * 0.87 * 0.15).abs() < 1e-9);
}

#[test]
fn test_upcoming_week() {
    let snapshot = portfolio();
    let config = LedgerConfig::default();
    let dashboard = RentalDashboard::new(&snapshot, &config).unwrap();

    let today = d(2024, 1, 27);
    let movements = dashboard.upcoming_movements(today, &DashboardFilter::default());
    assert_eq!(movements.len(), 1);
    assert_eq!(movements[0].stay_id, 2);
    assert_eq!(movements[0].kind, BoundaryKind::CheckIn);

    let later = today.checked_add_days(Days::new(8)).unwrap();
    assert!(dashboard
        .upcoming_movements(later, &DashboardFilter::default())
        .iter()
        .all(|m| m.date >= later));
}

#[test]
fn test_expense_report_filters() {
    let snapshot = portfolio();
    let config = LedgerConfig::default();
    let dashboard = RentalDashboard::new(&snapshot, &config).unwrap();

    let all = dashboard.expense_report(2024, &DashboardFilter::default(), None);
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].month, 1);
    assert_eq!(all[0].expense_type, ExpenseType::CondoFee);

    let utilities: BTreeSet<ExpenseType> = ExpenseType::ALL
        .into_iter()
        .filter(|t| t.is_utility())
        .collect();
    let only_utilities = dashboard.expense_report(2024, &DashboardFilter::default(), Some(&utilities));
    assert_eq!(only_utilities.len(), 1);
    assert_eq!(only_utilities[0].unit_name, "City Loft");

    let beach_only = dashboard.expense_report(2024, &DashboardFilter::single_unit(1), Some(&utilities));
    assert!(beach_only.is_empty());
}

#[test]
fn test_schema_generation() {
    let schema = LedgerSnapshot::schema_as_json().unwrap();
    assert!(schema.contains("LedgerSnapshot"));
    assert!(schema.contains("day_use") || schema.contains("DayUse"));
}
