use crate::domains::fee::types::{
    unknown_fee_type, AssociationType, FamilyFeeRecord, FeeDefinition, FeeType, PaymentStatus, ScheduleEntry,
};
use crate::errors::{DomainError, DomainResult};
use crate::validation::Validate;
use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_DURATION_MONTHS: u32 = 12;
pub const DEFAULT_BROKEN_UP_COUNT: u32 = 1;

/// What a record declares when end-date clipping produced fewer entries than its duration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClippedTotalPolicy {
    /// Keep EntireFeeAmount and Duration from the computed month count.
    #[default]
    Declared,
    /// Recompute EntireFeeAmount and Duration from the entries actually generated.
    Scheduled,
}

impl ClippedTotalPolicy {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "declared" => Some(ClippedTotalPolicy::Declared),
            "scheduled" => Some(ClippedTotalPolicy::Scheduled),
            _ => None,
        }
    }
}

/// Defaults applied while generating schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduleOptions {
    pub default_duration_months: u32,
    pub default_broken_up_count: u32,
    pub clipped_total: ClippedTotalPolicy,
}

impl Default for ScheduleOptions {
    fn default() -> Self {
        Self {
            default_duration_months: DEFAULT_DURATION_MONTHS,
            default_broken_up_count: DEFAULT_BROKEN_UP_COUNT,
            clipped_total: ClippedTotalPolicy::Declared,
        }
    }
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            let leap = (year % 4 == 0 && year % 100 != 0) || year % 400 == 0;
            if leap { 29 } else { 28 }
        }
    }
}

/// Advance by calendar months, clamping the day to the target month's length and keeping the
/// time of day. `None` only when the result leaves chrono's supported range.
pub fn add_calendar_months(date: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    let month_index = date.month0() as i64 + months as i64;
    let year = i32::try_from(date.year() as i64 + month_index.div_euclid(12)).ok()?;
    let month = month_index.rem_euclid(12) as u32 + 1;
    let day = date.day().min(days_in_month(year, month));
    let day = NaiveDate::from_ymd_opt(year, month, day)?;
    Some(NaiveDateTime::new(day, date.time()).and_utc())
}

/// Whole calendar months from `start` to `end`, ignoring the day of month. Negative when
/// `end` lies in an earlier month.
pub fn months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    (end.year() as i64 - start.year() as i64) * 12 + (end.month() as i64 - start.month() as i64)
}

/// "<MonthName> <Year>", always in English.
pub fn month_label(date: DateTime<Utc>) -> String {
    date.format("%B %Y").to_string()
}

fn entry(amount: Decimal, due_date: DateTime<Utc>) -> ScheduleEntry {
    ScheduleEntry {
        month: month_label(due_date),
        amount,
        due_date,
        status: PaymentStatus::Unpaid,
    }
}

/// Materialize `fee` for one family with the default options.
pub fn build_family_fee_record(
    fee: &FeeDefinition,
    association_type: AssociationType,
    association_id: &str,
    reference_date: DateTime<Utc>,
) -> DomainResult<FamilyFeeRecord> {
    build_family_fee_record_with(
        fee,
        association_type,
        association_id,
        reference_date,
        &ScheduleOptions::default(),
    )
}

/// Materialize `fee` for one family. Pure apart from logging: identical inputs give identical
/// records, and store-owned fields (id, timestamps) are left empty.
pub fn build_family_fee_record_with(
    fee: &FeeDefinition,
    association_type: AssociationType,
    association_id: &str,
    reference_date: DateTime<Utc>,
    options: &ScheduleOptions,
) -> DomainResult<FamilyFeeRecord> {
    fee.validate()?;
    let fee_type = fee
        .parsed_type()
        .ok_or_else(|| unknown_fee_type(fee.fee_type.as_deref().unwrap_or_default()))?;

    let mut record = FamilyFeeRecord {
        id: None,
        name: fee.name.clone(),
        amount: fee.amount,
        fee_type,
        is_recurring: fee_type == FeeType::Recurring,
        created_at: None,
        last_updated: None,
        fee_id: fee.id.clone(),
        association_type,
        association_id: association_id.to_string(),
        is_active: true,
        has_end_date: fee.has_end_date,
        fee_end_date: fee.effective_end_date(),
        entire_fee_amount: fee.amount,
        duration: None,
        schedule: Vec::new(),
    };

    match fee_type {
        FeeType::OneTime => {
            record.schedule.push(entry(fee.amount, reference_date));
        }
        FeeType::Recurring => {
            let split = fee
                .broken_up_count
                .filter(|count| *count > 0)
                .unwrap_or(options.default_broken_up_count)
                .max(1);
            let monthly_amount = fee.amount / Decimal::from(split);

            let nominal_months = fee
                .duration
                .filter(|months| *months > 0)
                .unwrap_or(options.default_duration_months)
                .max(1);

            let end_date = fee.effective_end_date();
            let effective_months = match end_date {
                Some(end) => {
                    let span = months_between(reference_date.date_naive(), end) + 1;
                    (nominal_months as i64).min(span.max(1)) as u32
                }
                None => nominal_months,
            };

            for i in 0..effective_months {
                let due_date = add_calendar_months(reference_date, i).ok_or_else(|| {
                    DomainError::Internal(format!(
                        "due date {} months after {} is out of range",
                        i, reference_date
                    ))
                })?;
                if matches!(end_date, Some(end) if due_date.date_naive() > end) {
                    break;
                }
                record.schedule.push(entry(monthly_amount, due_date));
            }

            record.entire_fee_amount = monthly_amount * Decimal::from(effective_months);
            record.duration = Some(effective_months);

            if record.schedule.len() < effective_months as usize {
                log::warn!(
                    "Fee {} scheduled {} of {} months before its end date {:?}; declared total {} vs scheduled {}",
                    fee.id,
                    record.schedule.len(),
                    effective_months,
                    end_date,
                    record.entire_fee_amount,
                    record.scheduled_total()
                );
                if options.clipped_total == ClippedTotalPolicy::Scheduled {
                    record.entire_fee_amount = record.scheduled_total();
                    record.duration = Some(record.schedule.len() as u32);
                }
            }
        }
    }

    Ok(record)
}
