use gauze::XorFilter;
use rand::distributions::Alphanumeric;
use rand::Rng;

/// S6 (Xor build + query): build from 1000 random 10-character strings at
/// ε=1e-4; every member queries positive, and the false-positive rate over
/// a large non-member sample stays within budget.
#[test]
fn scenario_s6_xor_build_and_query() {
    let mut rng = rand::thread_rng();
    let members: Vec<String> = (0..1_000)
        .map(|_| {
            (&mut rng)
                .sample_iter(&Alphanumeric)
                .take(10)
                .map(char::from)
                .collect()
        })
        .collect();

    let filter = XorFilter::build(1e-4, members.clone()).unwrap();

    for member in &members {
        assert!(filter.contains(member));
    }

    let member_set: std::collections::HashSet<&String> = members.iter().collect();
    let trials = 100_000;
    let mut false_positives = 0;
    for _ in 0..trials {
        let probe: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(10)
            .map(char::from)
            .collect();
        if !member_set.contains(&probe) && filter.contains(&probe) {
            false_positives += 1;
        }
    }
    let observed_rate = false_positives as f64 / trials as f64;
    assert!(observed_rate < 1e-3, "observed rate {observed_rate}");
}

#[test]
fn build_fails_cleanly_on_empty_input() {
    let empty: Vec<String> = vec![];
    assert!(XorFilter::build(0.01, empty).is_err());
}
