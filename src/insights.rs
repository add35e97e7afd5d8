//! Dashboard insights
//!
//! Pure aggregation over one recipient's feedback records. The input
//! collection is newest-first, the order storage hands it out in; the trend
//! series restores chronological order itself.

use serde::Serialize;

use crate::feedback::Feedback;
use crate::feedback::MAX_RATING;
use crate::feedback::MIN_RATING;
use crate::templates::Template;

/// How many of the most recent records feed the trend series
pub const TREND_WINDOW: usize = 30;

/// Labels for the built-in category identifiers
///
/// Used when no template of the recipient carries the category.
const CATEGORY_LABELS: [(&str, &str); 16] = [
    ("service_quality", "Service Quality"),
    ("response_time", "Response Time"),
    ("problem_resolution", "Problem Resolution"),
    ("overall_experience", "Overall Experience"),
    ("product_quality", "Product Quality"),
    ("features", "Features"),
    ("usability", "Usability"),
    ("value_for_money", "Value for Money"),
    ("food_quality", "Food Quality"),
    ("service", "Service"),
    ("ambiance", "Ambiance"),
    ("value", "Value"),
    ("organization", "Organization"),
    ("content_quality", "Content Quality"),
    ("venue", "Venue"),
    ("overall_satisfaction", "Overall Satisfaction"),
];

/// Aggregated metrics over a recipient's feedback
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Insights {
    /// Mean of all ratings, rounded to one decimal; 0.0 when empty
    pub average_rating: f64,

    /// Number of feedback records
    pub total_responses: usize,

    /// The category with the highest mean rating
    pub top_category: Option<CategoryAverage>,

    /// Mean rating per category, in first-encountered order
    pub category_averages: Vec<CategoryAverage>,

    /// Rating distribution, five buckets ordered 5 down to 1
    pub distribution: Vec<RatingBucket>,

    /// Per-day mean rating over the most recent records, oldest day first
    pub trend: Vec<TrendPoint>,
}

/// Mean rating of a single category
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAverage {
    /// Category identifier
    pub category: String,

    /// Human readable label
    pub label: String,

    /// Mean rating of the group, rounded to one decimal
    pub average_rating: f64,

    /// Number of records in the group
    pub responses: usize,
}

/// Number of records with one exact rating
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RatingBucket {
    /// The rating of the bucket
    pub rating: i32,

    /// How many records carry it
    pub count: usize,
}

/// Mean rating of one calendar day
#[derive(Clone, Debug, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrendPoint {
    /// The day, formatted like "Jan 5"
    pub date: String,

    /// Mean rating of the day, rounded to one decimal
    pub average_rating: f64,
}

/// Aggregate a newest-first feedback collection into dashboard metrics
///
/// The templates are only consulted for category labels.
pub fn generate(feedback: &[Feedback], templates: &[Template]) -> Insights {
    let category_averages = category_averages(feedback, templates);

    // first-encountered group wins a tie for the top spot
    let top_category = category_averages
        .iter()
        .fold(None::<&CategoryAverage>, |top, group| match top {
            Some(top) if top.average_rating >= group.average_rating => Some(top),
            _ => Some(group),
        })
        .cloned();

    Insights {
        average_rating: average_rating(feedback),
        total_responses: feedback.len(),
        top_category,
        category_averages,
        distribution: distribution(feedback),
        trend: trend(feedback),
    }
}

/// Mean of all ratings, rounded to one decimal; 0.0 for an empty collection
pub fn average_rating(feedback: &[Feedback]) -> f64 {
    if feedback.is_empty() {
        return 0.0;
    }

    let sum = feedback
        .iter()
        .map(|feedback| f64::from(feedback.rating))
        .sum::<f64>();

    round_to_tenth(sum / to_f64(feedback.len()))
}

/// Count records per rating, all five buckets, ordered 5 down to 1
pub fn distribution(feedback: &[Feedback]) -> Vec<RatingBucket> {
    (MIN_RATING..=MAX_RATING)
        .rev()
        .map(|rating| RatingBucket {
            rating,
            count: feedback
                .iter()
                .filter(|feedback| feedback.rating == rating)
                .count(),
        })
        .collect()
}

/// Group by category in first-encountered order, mean per group
pub fn category_averages(feedback: &[Feedback], templates: &[Template]) -> Vec<CategoryAverage> {
    let mut groups: Vec<(String, f64, usize)> = Vec::new();

    for feedback in feedback {
        let rating = f64::from(feedback.rating);

        match groups
            .iter_mut()
            .find(|(category, _, _)| *category == feedback.category)
        {
            Some((_, sum, count)) => {
                *sum += rating;
                *count += 1;
            }
            None => groups.push((feedback.category.clone(), rating, 1)),
        }
    }

    groups
        .into_iter()
        .map(|(category, sum, count)| CategoryAverage {
            label: resolve_label(&category, templates),
            category,
            average_rating: round_to_tenth(sum / to_f64(count)),
            responses: count,
        })
        .collect()
}

/// Day-bucketed running mean over the most recent records
///
/// Takes at most [`TREND_WINDOW`] records off the newest-first input,
/// restores chronological order and folds each record into its day's mean
/// incrementally. Matches the plain per-day mean to one decimal.
pub fn trend(feedback: &[Feedback]) -> Vec<TrendPoint> {
    let mut days: Vec<(String, f64, usize)> = Vec::new();

    for feedback in feedback.iter().take(TREND_WINDOW).rev() {
        let day = feedback.created_at.format("%b %-d").to_string();
        let rating = f64::from(feedback.rating);

        match days.iter_mut().find(|(date, _, _)| *date == day) {
            Some((_, mean, count)) => {
                *mean = (*mean * to_f64(*count) + rating) / to_f64(*count + 1);
                *count += 1;
            }
            None => days.push((day, rating, 1)),
        }
    }

    days.into_iter()
        .map(|(date, mean, _)| TrendPoint {
            date,
            average_rating: round_to_tenth(mean),
        })
        .collect()
}

/// Resolve a category identifier to a human readable label
///
/// Template labels win, then the built-in mapping, then a title-cased
/// rendition of the identifier itself.
fn resolve_label(category_id: &str, templates: &[Template]) -> String {
    let template_label = templates
        .iter()
        .flat_map(|template| &template.categories)
        .find(|category| category.id == category_id)
        .map(|category| category.label.clone());

    if let Some(label) = template_label {
        return label;
    }

    CATEGORY_LABELS
        .iter()
        .find(|(id, _)| *id == category_id)
        .map_or_else(|| humanize(category_id), |(_, label)| (*label).to_string())
}

/// Turn an identifier like `checkout_flow` into `Checkout Flow`
fn humanize(category_id: &str) -> String {
    category_id
        .split('_')
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            chars.next().map_or_else(String::new, |first| {
                first.to_uppercase().collect::<String>() + chars.as_str()
            })
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Round to one decimal
fn round_to_tenth(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

#[allow(clippy::cast_precision_loss)] // counts stay far below 2^52
fn to_f64(count: usize) -> f64 {
    count as f64
}

#[cfg(test)]
#[allow(clippy::float_cmp)] // comparing identically rounded values
mod tests {
    use chrono::NaiveDate;
    use chrono::naive::NaiveDateTime;
    use uuid::Uuid;

    use crate::templates::Category;

    use super::*;

    fn at(day: u32, hour: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 1, day)
            .expect("valid date")
            .and_hms_opt(hour, 0, 0)
            .expect("valid time")
    }

    fn record(rating: i32, category: &str, created_at: NaiveDateTime) -> Feedback {
        Feedback {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            template_id: None,
            rating,
            category: category.to_string(),
            comment: "Comment".to_string(),
            created_at,
        }
    }

    /// Newest-first collection out of (rating, category, created_at) rows
    fn collection(rows: &[(i32, &str, NaiveDateTime)]) -> Vec<Feedback> {
        let mut feedback = rows
            .iter()
            .map(|(rating, category, created_at)| record(*rating, category, *created_at))
            .collect::<Vec<Feedback>>();

        feedback.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        feedback
    }

    #[test]
    fn test_empty_collection() {
        let insights = generate(&[], &[]);

        assert_eq!(0.0, insights.average_rating);
        assert_eq!(0, insights.total_responses);
        assert_eq!(None, insights.top_category);
        assert!(insights.category_averages.is_empty());
        assert!(insights.trend.is_empty());

        // all five buckets are present even when empty
        assert_eq!(5, insights.distribution.len());
        assert!(insights.distribution.iter().all(|bucket| bucket.count == 0));
    }

    #[test]
    fn test_average_rating_rounds_to_one_decimal() {
        let feedback = collection(&[
            (5, "service", at(3, 10)),
            (4, "service", at(2, 10)),
            (4, "service", at(1, 10)),
        ]);

        // 13 / 3 = 4.333...
        assert_eq!(4.3, average_rating(&feedback));

        let feedback = collection(&[(4, "service", at(1, 10)), (5, "service", at(1, 11))]);
        assert_eq!(4.5, average_rating(&feedback));
    }

    #[test]
    fn test_distribution_counts_and_order() {
        let feedback = collection(&[
            (5, "service", at(1, 1)),
            (5, "service", at(1, 2)),
            (3, "service", at(1, 3)),
            (1, "service", at(1, 4)),
        ]);

        let buckets = distribution(&feedback);

        let ratings = buckets
            .iter()
            .map(|bucket| bucket.rating)
            .collect::<Vec<i32>>();
        assert_eq!(vec![5, 4, 3, 2, 1], ratings);

        let counts = buckets
            .iter()
            .map(|bucket| bucket.count)
            .collect::<Vec<usize>>();
        assert_eq!(vec![2, 0, 1, 0, 1], counts);

        let total = buckets.iter().map(|bucket| bucket.count).sum::<usize>();
        assert_eq!(feedback.len(), total);
    }

    #[test]
    fn test_category_averages_group_and_partition() {
        let feedback = collection(&[
            (5, "speed", at(4, 1)),
            (4, "taste", at(3, 1)),
            (3, "speed", at(2, 1)),
            (2, "taste", at(1, 1)),
        ]);

        let groups = category_averages(&feedback, &[]);

        assert_eq!(2, groups.len());

        // first-encountered order over the newest-first input
        assert_eq!("speed", groups[0].category);
        assert_eq!(4.0, groups[0].average_rating);
        assert_eq!(2, groups[0].responses);

        assert_eq!("taste", groups[1].category);
        assert_eq!(3.0, groups[1].average_rating);

        let grouped = groups.iter().map(|group| group.responses).sum::<usize>();
        assert_eq!(feedback.len(), grouped);
    }

    #[test]
    fn test_top_category_tie_breaks_first_encountered() {
        let feedback = collection(&[
            (4, "speed", at(3, 1)),
            (4, "taste", at(2, 1)),
            (4, "value", at(1, 1)),
        ]);

        let insights = generate(&feedback, &[]);

        let top = insights.top_category.expect("a top category");
        assert_eq!("speed", top.category);
        assert_eq!(4.0, top.average_rating);
    }

    #[test]
    fn test_top_category_highest_mean_wins() {
        let feedback = collection(&[
            (2, "speed", at(4, 1)),
            (5, "taste", at(3, 1)),
            (5, "taste", at(2, 1)),
            (3, "speed", at(1, 1)),
        ]);

        let insights = generate(&feedback, &[]);

        assert_eq!("taste", insights.top_category.expect("a top category").category);
    }

    #[test]
    fn test_trend_incremental_mean_matches_plain_mean() {
        // one day, ratings folded in two different orders
        let forward = collection(&[
            (5, "service", at(1, 1)),
            (1, "service", at(1, 2)),
            (3, "service", at(1, 3)),
        ]);
        let backward = collection(&[
            (3, "service", at(1, 1)),
            (1, "service", at(1, 2)),
            (5, "service", at(1, 3)),
        ]);

        let forward_trend = trend(&forward);
        let backward_trend = trend(&backward);

        assert_eq!(1, forward_trend.len());
        assert_eq!("Jan 1", forward_trend[0].date);
        // (5 + 1 + 3) / 3
        assert_eq!(3.0, forward_trend[0].average_rating);
        assert_eq!(forward_trend, backward_trend);
    }

    #[test]
    fn test_trend_rounding_matches_plain_mean() {
        // 4, 4, 5 -> 4.333... -> 4.3
        let feedback = collection(&[
            (4, "service", at(2, 1)),
            (4, "service", at(2, 2)),
            (5, "service", at(2, 3)),
        ]);

        let points = trend(&feedback);

        assert_eq!(4.3, points[0].average_rating);
    }

    #[test]
    fn test_trend_days_chronological() {
        let feedback = collection(&[
            (5, "service", at(2, 1)),
            (3, "service", at(1, 1)),
            (4, "service", at(3, 1)),
        ]);

        let points = trend(&feedback);

        let dates = points
            .iter()
            .map(|point| point.date.as_str())
            .collect::<Vec<&str>>();
        assert_eq!(vec!["Jan 1", "Jan 2", "Jan 3"], dates);
    }

    #[test]
    fn test_trend_window_takes_most_recent() {
        // 31 days of single records, newest-first; Jan 1 falls outside
        let rows = (1..=31)
            .map(|day| (3, "service", at(day, 1)))
            .collect::<Vec<(i32, &str, NaiveDateTime)>>();
        let feedback = collection(&rows);

        let points = trend(&feedback);

        assert_eq!(TREND_WINDOW, points.len());
        assert_eq!("Jan 2", points[0].date);
        assert_eq!("Jan 31", points[points.len() - 1].date);
    }

    #[test]
    fn test_label_resolution() {
        let template = Template {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            name: "Lunch".to_string(),
            description: None,
            categories: vec![Category {
                id: "speed".to_string(),
                label: "Speed of Service".to_string(),
            }],
            is_default: false,
            created_at: at(1, 1),
            updated_at: at(1, 1),
        };

        // template label wins
        let feedback = collection(&[(5, "speed", at(1, 1))]);
        let groups = category_averages(&feedback, std::slice::from_ref(&template));
        assert_eq!("Speed of Service", groups[0].label);

        // built-in mapping
        let feedback = collection(&[(5, "service_quality", at(1, 1))]);
        let groups = category_averages(&feedback, &[]);
        assert_eq!("Service Quality", groups[0].label);

        // title-cased fallback
        let feedback = collection(&[(5, "checkout_flow", at(1, 1))]);
        let groups = category_averages(&feedback, &[]);
        assert_eq!("Checkout Flow", groups[0].label);
    }
}
