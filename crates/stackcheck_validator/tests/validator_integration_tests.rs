//! Integration tests for end-to-end template validation.

use std::fs;
use std::sync::Arc;

use stackcheck_spec::{loader, InconsistencyConfiguration, Specification};
use stackcheck_template::{Resource, SourceFormat};
use stackcheck_validator::{
    CustomResourceValidator, ResourceValidation, TemplateValidator, ValidatorConfig,
};
use tempfile::tempdir;

const SPEC: &str = r#"{
  "ResourceSpecificationVersion": "18.0.0",
  "PropertyTypes": {
    "AWS::EC2::SecurityGroup.Ingress": {
      "Properties": {
        "IpProtocol": {"PrimitiveType": "String", "Required": true},
        "CidrIp": {"PrimitiveType": "String", "Required": false}
      }
    },
    "Tag": {
      "Properties": {
        "Key": {"PrimitiveType": "String", "Required": true},
        "Value": {"PrimitiveType": "String", "Required": true}
      }
    }
  },
  "ResourceTypes": {
    "AWS::EC2::VPC": {
      "Attributes": {"CidrBlock": {"PrimitiveType": "String"}, "VpcId": {"PrimitiveType": "String"}},
      "Properties": {
        "CidrBlock": {"PrimitiveType": "String", "Required": true},
        "Tags": {"Type": "List", "ItemType": "Tag", "Required": false}
      }
    },
    "AWS::EC2::SecurityGroup": {
      "Properties": {
        "GroupDescription": {"PrimitiveType": "String", "Required": true},
        "SecurityGroupIngress": {"Type": "List", "ItemType": "Ingress", "Required": false},
        "VpcId": {"PrimitiveType": "String", "Required": false}
      }
    },
    "AWS::SNS::Topic": {
      "Properties": {
        "TopicName": {"PrimitiveType": "String", "Required": false},
        "Subscription": {"Type": "List", "PrimitiveItemType": "String", "Required": false}
      }
    }
  }
}"#;

fn spec() -> Arc<Specification> {
    Arc::new(loader::from_json_str(SPEC).unwrap())
}

fn validator() -> TemplateValidator {
    TemplateValidator::new(spec(), ValidatorConfig::default()).unwrap()
}

#[test]
fn test_required_property_present_is_valid() {
    let report = validator()
        .validate_source(
            b"Resources:\n  Vpc:\n    Type: AWS::EC2::VPC\n    Properties:\n      CidrBlock: 10.0.0.0/16\n",
            None,
        )
        .unwrap();
    assert!(report.valid());
    assert_eq!(report.resource("Vpc").unwrap().errors().count(), 0);
}

#[test]
fn test_unknown_type_has_exactly_one_error() {
    let report = validator()
        .validate_source(
            br#"{"Resources": {"Thing": {"Type": "InvalidType", "Properties": {"A": 1}}}}"#,
            None,
        )
        .unwrap();
    assert!(!report.valid());
    let thing = report.resource("Thing").unwrap();
    assert_eq!(thing.errors().collect::<Vec<_>>(), ["Type needs to be specified"]);
    assert_eq!(thing.diagnostics.len(), 1);
}

#[test]
fn test_reconciled_null_is_not_reported_missing() {
    let source = "Resources:\n  Sg:\n    Type: AWS::EC2::SecurityGroup\n    Properties:\n      GroupDescription:\n        - web\n        -\n        - tier\n      SecurityGroupIngress:\n        - IpProtocol: tcp\n";
    let report = validator()
        .validate_source(source.as_bytes(), Some(SourceFormat::Yaml))
        .unwrap();

    assert!(report.valid(), "{}", report.report());
    assert_eq!(report.notices.len(), 1);
    assert!(report.notices[0].starts_with("Removed 1 null value"));
}

#[test]
fn test_vpc_cidr_without_mask_fails_custom_rule() {
    let report = validator()
        .validate_source(
            br#"{"Resources": {"Vpc": {"Type": "AWS::EC2::VPC", "Properties": {"CidrBlock": "10.0.0.0"}}}}"#,
            None,
        )
        .unwrap();
    assert!(!report.valid());
    assert_eq!(
        report.resource("Vpc").unwrap().errors().collect::<Vec<_>>(),
        ["CidrBlock 10.0.0.0 is not a valid CIDR block"]
    );
}

#[test]
fn test_every_missing_required_property_is_reported() {
    let report = validator()
        .validate_source(
            b"Resources:\n  Vpc:\n    Type: AWS::EC2::VPC\n  Sg:\n    Type: AWS::EC2::SecurityGroup\n    Properties:\n      VpcId: !Ref Vpc\n",
            None,
        )
        .unwrap();

    let vpc: Vec<_> = report.resource("Vpc").unwrap().errors().collect();
    assert_eq!(vpc, ["Property CidrBlock is required"]);
    let sg: Vec<_> = report.resource("Sg").unwrap().errors().collect();
    assert_eq!(sg, ["Property GroupDescription is required"]);
}

#[test]
fn test_adding_a_bad_resource_never_restores_validity() {
    let good = "Resources:\n  Topic:\n    Type: AWS::SNS::Topic\n";
    let bad = format!("{}  Broken:\n    Type: InvalidType\n", good);

    let validator = validator();
    assert!(validator.validate_source(good.as_bytes(), None).unwrap().valid());
    assert!(!validator.validate_source(bad.as_bytes(), None).unwrap().valid());
}

#[test]
fn test_list_item_type_emptiness() {
    let validator = validator();

    let structured = validator
        .validate_source(
            br#"{"Resources": {"Vpc": {"Type": "AWS::EC2::VPC", "Properties": {"CidrBlock": "10.0.0.0/16", "Tags": []}}}}"#,
            None,
        )
        .unwrap();
    assert!(structured.valid());

    let primitive = validator
        .validate_source(
            br#"{"Resources": {"Topic": {"Type": "AWS::SNS::Topic", "Properties": {"Subscription": []}}}}"#,
            None,
        )
        .unwrap();
    assert_eq!(
        primitive.resource("Topic").unwrap().errors().collect::<Vec<_>>(),
        ["Subscription must be a List"]
    );

    let missing_key = validator
        .validate_source(
            b"Resources:\n  Vpc:\n    Type: AWS::EC2::VPC\n    Properties:\n      CidrBlock: 10.0.0.0/16\n      Tags:\n        - Value: web\n",
            None,
        )
        .unwrap();
    assert_eq!(
        missing_key.resource("Vpc").unwrap().errors().collect::<Vec<_>>(),
        ["Key is required in Tags"]
    );
}

#[test]
fn test_shorthand_template_end_to_end() {
    let source = r#"Parameters:
  Env:
    Type: String
Mappings:
  Networks:
    prod:
      Cidr: 10.1.0.0/16
Resources:
  Vpc:
    Type: AWS::EC2::VPC
    Properties:
      CidrBlock: !FindInMap [Networks, !Ref Env, Cidr]
      Tags:
        - Key: Name
          Value: !Sub '${Env}-vpc'
  Sg:
    Type: AWS::EC2::SecurityGroup
    Properties:
      GroupDescription: !Join
        - " "
        - [web, !Ref Env]
      VpcId: !GetAtt Vpc.VpcId
      SecurityGroupIngress:
        - IpProtocol: tcp
          CidrIp: !GetAtt Vpc.CidrBlock
  Topic:
    Type: AWS::SNS::Topic
    Properties:
      TopicName: !Ref Missing
"#;
    let report = validator().validate_source(source.as_bytes(), None).unwrap();

    assert!(report.resource("Vpc").unwrap().is_valid());
    assert!(report.resource("Sg").unwrap().is_valid());
    assert_eq!(
        report.resource("Topic").unwrap().errors().collect::<Vec<_>>(),
        ["Ref Missing does not name a parameter or resource"]
    );
}

#[test]
fn test_file_with_inconsistency_configuration() {
    let temp = tempdir().unwrap();
    let template = temp.path().join("stack.yaml");
    fs::write(
        &template,
        "Resources:\n  Sg:\n    Type: AWS::EC2::SecurityGroup\n    Properties:\n      GroupDescription: web\n",
    )
    .unwrap();
    let inconsistencies = temp.path().join("inconsistencies.yaml");
    fs::write(
        &inconsistencies,
        "AWS::EC2::SecurityGroup:\n  GroupDescription: [Required]\n",
    )
    .unwrap();

    let config = ValidatorConfig::new()
        .with_inconsistencies(InconsistencyConfiguration::from_file(&inconsistencies).unwrap());
    let report = TemplateValidator::new(spec(), config)
        .unwrap()
        .validate_file(&template)
        .unwrap();

    assert!(report.valid());
    assert_eq!(report.summary().warnings, 1);
}

struct TopicNamePrefix;

impl CustomResourceValidator for TopicNamePrefix {
    fn resource_type(&self) -> &str {
        "AWS::SNS::Topic"
    }

    fn validate(&self, _name: &str, resource: &Resource, validation: &mut ResourceValidation) {
        let named = resource
            .property("TopicName")
            .and_then(|v| v.as_str())
            .is_some_and(|name| name.starts_with("team-"));
        if !named {
            validation.add_warning("TopicName should start with team-");
        }
    }
}

#[test]
fn test_registered_custom_validator() {
    let mut validator = validator();
    validator.register(Arc::new(TopicNamePrefix));

    let report = validator
        .validate_source(b"Resources:\n  Topic:\n    Type: AWS::SNS::Topic\n", None)
        .unwrap();
    assert!(report.valid());
    assert_eq!(
        report.resource("Topic").unwrap().warnings().collect::<Vec<_>>(),
        ["TopicName should start with team-"]
    );
    assert!(report.report().contains("TopicName should start with team-"));
}
