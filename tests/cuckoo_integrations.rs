use gauze::CuckooFilter;
use pretty_assertions::assert_eq;
use rand::distributions::Alphanumeric;
use rand::Rng;

const US_STATES: [&str; 50] = [
    "Alabama",
    "Alaska",
    "Arizona",
    "Arkansas",
    "California",
    "Colorado",
    "Connecticut",
    "Delaware",
    "Florida",
    "Georgia",
    "Hawaii",
    "Idaho",
    "Illinois",
    "Indiana",
    "Iowa",
    "Kansas",
    "Kentucky",
    "Louisiana",
    "Maine",
    "Maryland",
    "Massachusetts",
    "Michigan",
    "Minnesota",
    "Mississippi",
    "Missouri",
    "Montana",
    "Nebraska",
    "Nevada",
    "New Hampshire",
    "New Jersey",
    "New Mexico",
    "New York",
    "North Carolina",
    "North Dakota",
    "Ohio",
    "Oklahoma",
    "Oregon",
    "Pennsylvania",
    "Rhode Island",
    "South Carolina",
    "South Dakota",
    "Tennessee",
    "Texas",
    "Utah",
    "Vermont",
    "Virginia",
    "Washington",
    "West Virginia",
    "Wisconsin",
    "Wyoming",
];

#[test]
fn insert_then_delete_is_transparent() {
    let mut c = CuckooFilter::new(1_000, 0.01).unwrap().with_seed(11);
    let bystanders: Vec<u64> = (0..200).collect();
    for k in &bystanders {
        c.insert_key(k).unwrap();
    }

    let before: Vec<bool> = bystanders.iter().map(|k| c.contains_key(k)).collect();

    c.insert_key(&"transient").unwrap();
    assert!(c.delete_key(&"transient"));

    let after: Vec<bool> = bystanders.iter().map(|k| c.contains_key(k)).collect();
    assert_eq!(before, after);
}

/// S5 (state-name round-trip), Cuckoo variant.
#[test]
fn scenario_s5_state_name_round_trip() {
    let mut c = CuckooFilter::new(100, 0.01).unwrap().with_seed(5);
    for state in US_STATES {
        c.insert_key(&state).unwrap();
    }
    for state in US_STATES {
        assert!(c.contains_key(&state));
    }

    let mut rng = rand::thread_rng();
    let trials = 100_000;
    let mut false_positives = 0;
    for _ in 0..trials {
        let probe: String = (&mut rng)
            .sample_iter(&Alphanumeric)
            .take(5)
            .map(char::from)
            .collect();
        if !US_STATES.contains(&probe.as_str()) && c.contains_key(&probe) {
            false_positives += 1;
        }
    }
    let observed_rate = false_positives as f64 / trials as f64;
    assert!(observed_rate < 0.01, "observed rate {observed_rate}");
}
