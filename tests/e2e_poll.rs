//! End-to-end poll tests with the real BFV parameters
//!
//! Owner keygen → poll creation → encrypted responses → close → owner decrypts
//! the element-wise AND of all availability vectors.

use private_polls::{PollClient, PollParams, PollService, ProtocolError, NIL};

fn owner_and_service() -> (PollClient, PollService) {
    let params = PollParams::pn13();
    let bfv = params.build().expect("parameters should build");
    let owner = PollClient::from_seed(bfv.clone(), [42u8; 32]);
    let service = PollService::with_bfv_params(params, bfv);
    (owner, service)
}

#[test]
fn test_e2e_three_participants_and() {
    let (owner, service) = owner_and_service();
    let keys = owner.generate_keys().unwrap();
    let id = service.create_poll(&keys.pk, &keys.rlk).unwrap();

    let snapshot = service.get_poll_public_state(&id).unwrap();
    let respondent = PollClient::from_public_key_text(service.registry().params().clone(), &snapshot.pubkey).unwrap();

    let inputs: [(&str, [u64; 7]); 3] = [
        ("alice", [1, 1, 1, 1, 1, 1, 1]),
        ("bob", [1, 0, 1, 0, 1, 0, 1]),
        ("carol", [1, 1, 1, 1, 1, 1, 1]),
    ];
    for (name, values) in &inputs {
        let ct = respondent.encrypt_availabilities(values).unwrap();
        service.submit_response(&id, name, &ct).unwrap();
    }

    service.close_poll(&id).unwrap();

    let snapshot = service.get_poll_public_state(&id).unwrap();
    assert!(snapshot.closed);
    assert_eq!(owner.decrypt_results(&snapshot.result).unwrap(), [1, 0, 1, 0, 1, 0, 1]);
}

#[test]
fn test_e2e_single_response() {
    let (owner, service) = owner_and_service();
    let keys = owner.generate_keys().unwrap();
    let id = service.create_poll(&keys.pk, &keys.rlk).unwrap();

    let respondent = PollClient::from_public_key_text(service.registry().params().clone(), &keys.pk).unwrap();
    let ct = respondent.encrypt_availabilities(&[0, 1, 1, 0, 1, 0, 0]).unwrap();
    service.submit_response(&id, "solo", &ct).unwrap();
    service.close_poll(&id).unwrap();

    let snapshot = service.get_poll_public_state(&id).unwrap();
    // Returned untouched
    assert_eq!(snapshot.result, ct);
    assert_eq!(owner.decrypt_results(&snapshot.result).unwrap(), [0, 1, 1, 0, 1, 0, 0]);
}

#[test]
fn test_e2e_resubmission_counts_once() {
    let (owner, service) = owner_and_service();
    let keys = owner.generate_keys().unwrap();
    let id = service.create_poll(&keys.pk, &keys.rlk).unwrap();

    let submit = |name: &str, values: [u64; 7]| {
        let ct = owner.encrypt_availabilities(&values).unwrap();
        service.submit_response(&id, name, &ct).unwrap();
    };
    submit("alice", [0, 0, 0, 0, 0, 0, 0]);
    submit("bob", [1, 1, 0, 1, 1, 1, 1]);
    submit("alice", [1, 1, 1, 1, 0, 1, 1]);

    service.close_poll(&id).unwrap();
    let snapshot = service.get_poll_public_state(&id).unwrap();
    assert_eq!(owner.decrypt_results(&snapshot.result).unwrap(), [1, 1, 0, 1, 0, 1, 1]);
}

#[test]
fn test_e2e_empty_poll() {
    let (owner, service) = owner_and_service();
    let keys = owner.generate_keys().unwrap();
    let id = service.create_poll(&keys.pk, &keys.rlk).unwrap();

    service.close_poll(&id).unwrap();
    let snapshot = service.get_poll_public_state(&id).unwrap();
    assert!(snapshot.closed);
    assert_eq!(snapshot.result, NIL);
    assert_eq!(service.close_poll(&id), Err(ProtocolError::AlreadyClosed));
}

#[test]
fn test_e2e_distinct_owners_distinct_polls() {
    let params = PollParams::pn13();
    let bfv = params.build().unwrap();
    let service = PollService::with_bfv_params(params, bfv.clone());

    let ids: Vec<String> = (0u8..3)
        .map(|seed| {
            let keys = PollClient::from_seed(bfv.clone(), [seed; 32]).generate_keys().unwrap();
            service.create_poll(&keys.pk, &keys.rlk).unwrap()
        })
        .collect();

    assert_eq!(service.registry().len(), 3);
    assert_ne!(ids[0], ids[1]);
    assert_ne!(ids[1], ids[2]);
    assert_ne!(ids[0], ids[2]);
}
