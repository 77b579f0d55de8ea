use fiveg_interface::nrf::{NrfInfo, NrfProvides, NrfRequires};
use fiveg_interface::upf::{UpfInfo, UpfProvides, UpfRequires};
use fiveg_interface::{
    CapabilityPayload, MemoryRelationStore, NegotiationState, RelationError, RelationRecord,
    RelationStore, Validation,
};

const NRF_RELATION: &str = "fiveg-nrf";
const UPF_RELATION: &str = "fiveg-upf";

fn nrf_info() -> NrfInfo {
    NrfInfo {
        ipv4_address: "1.2.3.4".into(),
        fqdn: "nrf.example.com".into(),
        port: "81".into(),
        api_version: "v1".into(),
    }
}

/// Store seen from the UPF with an NRF relation, and the relation id
fn upf_side_with_nrf_relation() -> (MemoryRelationStore, u32) {
    let mut store = MemoryRelationStore::new("oai-5g-upf");
    let id = store.add_relation(NRF_RELATION, Some("nrf"));
    (store, id)
}

#[test]
fn test_complete_nrf_data_is_available() {
    //given
    let (mut store, id) = upf_side_with_nrf_relation();
    store
        .update_app_data(id, "nrf", &nrf_info().to_record())
        .unwrap();
    let mut requires = NrfRequires::new(NRF_RELATION);

    //when
    let signal = requires.on_relation_changed(&store, id);

    //then
    assert_eq!(signal.map(|available| available.payload), Some(nrf_info()));
    assert_eq!(requires.state(), NegotiationState::Available);
    assert_eq!(requires.nrf_ipv4_address(&store).as_deref(), Some("1.2.3.4"));
    assert_eq!(requires.nrf_fqdn(&store).as_deref(), Some("nrf.example.com"));
    assert_eq!(requires.nrf_port(&store).as_deref(), Some("81"));
    assert_eq!(requires.nrf_api_version(&store).as_deref(), Some("v1"));
    assert!(requires.nrf_ipv4_address_available(&store));
    assert!(requires.nrf_fqdn_available(&store));
    assert!(requires.nrf_port_available(&store));
    assert!(requires.nrf_api_version_available(&store));
}

#[test]
fn test_each_missing_nrf_key_blocks_availability() {
    for missing in NrfInfo::FIELDS {
        //given
        let (mut store, id) = upf_side_with_nrf_relation();
        let mut record = nrf_info().to_record();
        record.remove(*missing);
        store.update_app_data(id, "nrf", &record).unwrap();
        let mut requires = NrfRequires::new(NRF_RELATION);

        //when
        let signal = requires.on_relation_changed(&store, id);

        //then
        assert_eq!(signal, None, "signalled without {missing}");
        assert_eq!(requires.state(), NegotiationState::AwaitingData);
        assert_eq!(requires.snapshot(&store), Validation::Incomplete(vec![*missing]));
        assert!(!requires.is_field_available(&store, missing));
    }
}

#[test]
fn test_port_is_not_parsed() {
    let (mut store, id) = upf_side_with_nrf_relation();
    let info = NrfInfo {
        port: "not-a-number".into(),
        ..nrf_info()
    };
    store.update_app_data(id, "nrf", &info.to_record()).unwrap();
    let mut requires = NrfRequires::new(NRF_RELATION);

    let signal = requires.on_relation_changed(&store, id);

    assert_eq!(signal.map(|available| available.payload.port).as_deref(), Some("not-a-number"));
}

#[test]
fn test_republishing_identical_data_is_idempotent() {
    //given
    let mut nrf_side = MemoryRelationStore::new("nrf");
    let id = nrf_side.add_relation(NRF_RELATION, Some("oai-5g-upf"));
    let provides = NrfProvides::new(NRF_RELATION);

    //when
    provides.set_nrf_information(&mut nrf_side, &nrf_info(), id).unwrap();
    let first = nrf_side.read(id, "nrf");
    provides.set_nrf_information(&mut nrf_side, &nrf_info(), id).unwrap();
    let second = nrf_side.read(id, "nrf");

    //then
    assert_eq!(first, Some(nrf_info().to_record()));
    assert_eq!(first, second);
    assert!(!nrf_side.update_app_data(id, "nrf", &nrf_info().to_record()).unwrap());
}

#[test]
fn test_repeated_signals_carry_the_same_payload() {
    let (mut store, id) = upf_side_with_nrf_relation();
    store
        .update_app_data(id, "nrf", &nrf_info().to_record())
        .unwrap();
    let mut requires = NrfRequires::new(NRF_RELATION);

    let first = requires.on_relation_changed(&store, id);
    store
        .update_app_data(id, "nrf", &nrf_info().to_record())
        .unwrap();
    let second = requires.on_relation_changed(&store, id);

    assert!(first.is_some());
    assert_eq!(first, second);
}

#[test]
fn test_publish_merges_into_existing_data() {
    //given
    let mut store = MemoryRelationStore::new("oai-5g-upf");
    let id = store.add_relation(UPF_RELATION, Some("smf"));
    store
        .update(id, &RelationRecord::from([("extra".to_string(), "kept".to_string())]))
        .unwrap();
    let provides = UpfProvides::new(UPF_RELATION);
    let info = UpfInfo {
        ipv4_address: "127.0.0.1".into(),
        fqdn: "oai-5g-upf.whatever.svc.cluster.local".into(),
    };

    //when
    provides.set_upf_information(&mut store, &info, id).unwrap();

    //then
    let record = store.read(id, "oai-5g-upf").unwrap();
    assert_eq!(record.get("extra").map(String::as_str), Some("kept"));
    assert_eq!(record.get("upf_ipv4_address").map(String::as_str), Some("127.0.0.1"));
    assert_eq!(
        record.get("upf_fqdn").map(String::as_str),
        Some("oai-5g-upf.whatever.svc.cluster.local")
    );
}

#[test]
fn test_publish_without_relation_fails() {
    let mut store = MemoryRelationStore::new("oai-5g-upf");
    let other = store.add_relation(NRF_RELATION, Some("nrf"));
    let provides = UpfProvides::new(UPF_RELATION);
    let info = UpfInfo::default();

    let err = provides
        .set_upf_information(&mut store, &info, other)
        .unwrap_err();

    assert_eq!(
        err,
        RelationError::RelationNotEstablished {
            relation: UPF_RELATION.into(),
            id: other,
        }
    );
    assert_eq!(store.read(other, "oai-5g-upf"), None);
}

#[test]
fn test_upf_requirer_sees_provider_data() {
    //given
    let mut smf_side = MemoryRelationStore::new("smf");
    let id = smf_side.add_relation(UPF_RELATION, Some("oai-5g-upf"));
    let mut requires = UpfRequires::new(UPF_RELATION);

    //when
    smf_side
        .update_app_data(
            id,
            "oai-5g-upf",
            &RelationRecord::from([("upf_fqdn".to_string(), "upf.local".to_string())]),
        )
        .unwrap();
    let partial = requires.on_relation_changed(&smf_side, id);

    //then
    assert_eq!(partial, None);
    assert!(requires.upf_fqdn_available(&smf_side));
    assert!(!requires.upf_ipv4_address_available(&smf_side));

    //when
    smf_side
        .update_app_data(
            id,
            "oai-5g-upf",
            &RelationRecord::from([("upf_ipv4_address".to_string(), "10.1.1.1".to_string())]),
        )
        .unwrap();
    let complete = requires.on_relation_changed(&smf_side, id);

    //then
    assert_eq!(
        complete.map(|available| available.payload),
        Some(UpfInfo {
            ipv4_address: "10.1.1.1".into(),
            fqdn: "upf.local".into(),
        })
    );
    assert_eq!(requires.upf_ipv4_address(&smf_side).as_deref(), Some("10.1.1.1"));
}
