use crate::models::{PollEntity, VoteValue};
use crate::voting::{ChartData, ChartSeries, ChartType};

/// Projects the option tallies of a poll into chart datasets.
///
/// Labels follow option order and every vote value gets one series, so a poll
/// without options yields an empty chart rather than an error.
pub fn generate_chart_data<P: PollEntity + ?Sized>(poll: &P, chart_type: ChartType) -> ChartData {
    let options = poll.options().snapshot();

    let labels = options.iter().map(|option| option.text.clone()).collect();
    let series = VoteValue::ALL
        .iter()
        .map(|&value| ChartSeries {
            label: value.label().to_string(),
            value,
            data: options.iter().map(|option| option.amount(value)).collect(),
        })
        .collect();

    ChartData {
        chart_type,
        labels,
        series,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Poll, PollOption, PollState};

    #[test]
    fn poll_without_options_gives_empty_chart() {
        let poll = Poll::new("Budget".to_string(), PollState::Finished);
        let chart = generate_chart_data(&poll, ChartType::Bar);

        assert!(chart.is_empty());
        assert_eq!(chart.series.len(), 3);
        assert!(chart.series.iter().all(|series| series.data.is_empty()));
        assert_eq!(chart.total(), 0.0);
    }

    #[test]
    fn series_follow_option_order() {
        let poll = Poll::new("Board".to_string(), PollState::Published);
        poll.options.populate(vec![
            PollOption::new("Alice").with_tally(10.0, 2.0, 1.0),
            PollOption::new("Bob").with_tally(4.0, 7.0, 0.0),
        ]);

        let chart = generate_chart_data(&poll, ChartType::HorizontalBar);

        assert_eq!(chart.chart_type, ChartType::HorizontalBar);
        assert_eq!(chart.labels, vec!["Alice", "Bob"]);
        assert_eq!(chart.series[0].value, VoteValue::Yes);
        assert_eq!(chart.series[0].label, "Yes");
        assert_eq!(chart.series[0].data, vec![10.0, 4.0]);
        assert_eq!(chart.series[1].data, vec![2.0, 7.0]);
        assert_eq!(chart.series[2].data, vec![1.0, 0.0]);
        assert_eq!(chart.total(), 24.0);
    }
}
