//! Route-response normalization.
//!
//! Turns the backend's path array, a mix of ride segments and transfer
//! markers distinguished by a boolean flag, into a typed [`Itinerary`].
//! Elapsed time is recomputed here rather than trusted from the payload.

use tracing::warn;

use super::error::RouteError;
use super::itinerary::{Itinerary, RideStep, RouteStep, TransferStep};
use crate::backend::{PathStep, RouteData};
use crate::domain::{LineId, StationName};

/// Minutes assumed for a transfer marker that carries no time.
///
/// Matches the fixed interchange penalty the route service applies.
pub const DEFAULT_TRANSFER_MINUTES: u32 = 5;

/// Normalize a backend route into an itinerary.
///
/// Steps keep backend order. Missing lines are inferred from neighbouring
/// rides, missing transfer messages are generated, and cumulative time is
/// the running sum of step minutes.
pub fn normalize(route: &RouteData) -> Result<Itinerary, RouteError> {
    let path = &route.path;
    if path.is_empty() {
        return Err(RouteError::EmptyPath);
    }
    if path.iter().all(|s| s.transfer) {
        return Err(RouteError::NoRides);
    }

    let ride_lines = resolve_ride_lines(path)?;

    let mut steps = Vec::with_capacity(path.len());
    let mut elapsed = 0u32;

    for (index, step) in path.iter().enumerate() {
        let normalized = if step.transfer {
            let (from_line, to_line) = resolve_transfer_lines(path, &ride_lines, index)?;
            let minutes = step.transfer_time.unwrap_or(DEFAULT_TRANSFER_MINUTES);
            elapsed = elapsed.saturating_add(minutes);
            let message = step
                .message
                .as_deref()
                .map(str::trim)
                .filter(|m| !m.is_empty())
                .map(str::to_string)
                .unwrap_or_else(|| transfer_message(to_line));

            RouteStep::Transfer(TransferStep {
                from_line,
                to_line,
                minutes,
                message,
                cumulative_minutes: elapsed,
            })
        } else {
            let minutes = step.segment_time.unwrap_or(0);
            elapsed = elapsed.saturating_add(minutes);

            // Every ride index was resolved above
            let line = ride_lines[index].ok_or(RouteError::MissingRideLine { index })?;

            RouteStep::Ride(RideStep {
                from: station_name(step.from_station.as_ref()),
                to: station_name(step.to_station.as_ref()),
                line,
                minutes,
                cumulative_minutes: elapsed,
            })
        };

        if let Some(reported) = step.cumulative_time
            && reported != elapsed
        {
            warn!(
                index,
                reported,
                computed = elapsed,
                "backend cumulative time disagrees"
            );
        }

        steps.push(normalized);
    }

    let transfer_count = steps.iter().filter(|s| s.is_transfer()).count();
    if let Some(reported) = route.transfer_count
        && reported as usize != transfer_count
    {
        warn!(
            reported,
            computed = transfer_count,
            "backend transfer count disagrees"
        );
    }

    let total_minutes = route
        .total_time
        .filter(|&t| t > 0)
        .unwrap_or(elapsed);

    let (first_from, last_to) = ride_endpoints(&steps);
    let origin = route
        .from_station
        .as_ref()
        .map(|s| s.name())
        .filter(|n| !n.is_empty())
        .unwrap_or(first_from);
    let destination = route
        .to_station
        .as_ref()
        .map(|s| s.name())
        .filter(|n| !n.is_empty())
        .unwrap_or(last_to);

    Ok(Itinerary {
        origin,
        destination,
        steps,
        total_minutes,
        transfer_count,
    })
}

/// The default instruction for a transfer onto `line`.
pub fn transfer_message(line: LineId) -> String {
    format!("换乘到{}号线", line)
}

fn station_name(station: Option<&crate::backend::StationRef>) -> StationName {
    station.map(|s| s.name()).unwrap_or_default()
}

fn line_of(raw: Option<i64>) -> Option<LineId> {
    raw.and_then(|n| LineId::from_i64(n).ok())
}

/// Resolve the line of every ride, indexed like `path`.
///
/// A ride without a line takes the line in effect: that of the previous
/// ride, or the destination line of a transfer marker between them.
fn resolve_ride_lines(path: &[PathStep]) -> Result<Vec<Option<LineId>>, RouteError> {
    let mut resolved = vec![None; path.len()];
    let mut current: Option<LineId> = None;

    for (index, step) in path.iter().enumerate() {
        if step.transfer {
            if let Some(to) = line_of(step.to_line) {
                current = Some(to);
            }
            continue;
        }

        let line = line_of(step.line_id)
            .or(current)
            .ok_or(RouteError::MissingRideLine { index })?;
        resolved[index] = Some(line);
        current = Some(line);
    }

    Ok(resolved)
}

fn resolve_transfer_lines(
    path: &[PathStep],
    ride_lines: &[Option<LineId>],
    index: usize,
) -> Result<(LineId, LineId), RouteError> {
    let step = &path[index];

    let from_line = line_of(step.from_line)
        .or_else(|| ride_lines[..index].iter().rev().find_map(|l| *l))
        .ok_or(RouteError::UnresolvedTransfer {
            index,
            side: "origin",
        })?;

    let to_line = line_of(step.to_line)
        .or_else(|| ride_lines[index + 1..].iter().find_map(|l| *l))
        .ok_or(RouteError::UnresolvedTransfer {
            index,
            side: "destination",
        })?;

    Ok((from_line, to_line))
}

fn ride_endpoints(steps: &[RouteStep]) -> (StationName, StationName) {
    let mut rides = steps.iter().filter_map(|s| match s {
        RouteStep::Ride(r) => Some(r),
        RouteStep::Transfer(_) => None,
    });
    let first = rides.next();
    let last = rides.last().or(first);
    (
        first.map(|r| r.from.clone()).unwrap_or_default(),
        last.map(|r| r.to.clone()).unwrap_or_default(),
    )
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    /// Alternating legs: each leg is a run of rides on one line, with a
    /// transfer marker between consecutive legs.
    fn arb_path() -> impl Strategy<Value = Vec<PathStep>> {
        proptest::collection::vec(
            (1i64..19, proptest::collection::vec(0u32..15, 1..5), 0u32..10),
            1..5,
        )
        .prop_map(|legs| {
            let mut path = Vec::new();
            let mut previous: Option<i64> = None;
            for (line, segments, transfer_minutes) in legs {
                if let Some(prev) = previous {
                    path.push(PathStep {
                        transfer: true,
                        from_line: Some(prev),
                        to_line: Some(line),
                        transfer_time: Some(transfer_minutes),
                        ..Default::default()
                    });
                }
                for minutes in segments {
                    path.push(PathStep {
                        line_id: Some(line),
                        segment_time: Some(minutes),
                        ..Default::default()
                    });
                }
                previous = Some(line);
            }
            path
        })
    }

    fn route(path: Vec<PathStep>) -> RouteData {
        RouteData {
            path,
            total_time: None,
            transfer_count: None,
            from_station: None,
            to_station: None,
        }
    }

    proptest! {
        /// Cumulative time never decreases and ends at the sum of step times
        #[test]
        fn cumulative_is_running_sum(path in arb_path()) {
            let itinerary = normalize(&route(path)).unwrap();
            let cumulative: Vec<u32> = itinerary.steps.iter().map(RouteStep::cumulative_minutes).collect();
            prop_assert!(cumulative.windows(2).all(|w| w[0] <= w[1]));

            let sum: u32 = itinerary.steps.iter().map(RouteStep::minutes).sum();
            prop_assert_eq!(cumulative.last().copied(), Some(sum));
            prop_assert_eq!(itinerary.total_minutes, sum);
        }

        /// Normalization keeps every step and counts transfers exactly
        #[test]
        fn steps_preserved(path in arb_path()) {
            let expected_transfers = path.iter().filter(|s| s.transfer).count();
            let len = path.len();
            let itinerary = normalize(&route(path)).unwrap();
            prop_assert_eq!(itinerary.steps.len(), len);
            prop_assert_eq!(itinerary.transfer_count, expected_transfers);
        }
    }
}
