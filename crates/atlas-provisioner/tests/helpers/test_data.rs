//! JSON fixtures shaped like Atlas API responses.

use serde_json::{json, Value};

pub const CLUSTER_URI: &str =
    "mongodb://c1-shard-00-00.abcde.mongodb.net:27017,c1-shard-00-01.abcde.mongodb.net:27017/?ssl=true&authSource=admin";

pub fn cluster(name: &str, state: &str) -> Value {
    json!({
        "id": format!("5b{name}"),
        "name": name,
        "groupId": "g1",
        "stateName": state,
        "mongoDBMajorVersion": "3.6",
        "mongoURI": "mongodb://c1-shard-00-00.abcde.mongodb.net:27017,c1-shard-00-01.abcde.mongodb.net:27017",
        "mongoURIWithOptions": CLUSTER_URI,
        "providerSettings": {
            "providerName": "AWS",
            "regionName": "US_EAST_2",
            "instanceSizeName": "M10"
        }
    })
}

pub fn containers() -> Value {
    json!({
        "results": [
            {
                "id": "ct-west",
                "providerName": "AWS",
                "regionName": "US_WEST_2",
                "vpcId": "vpc-west",
                "atlasCidrBlock": "192.168.240.0/21",
                "provisioned": true
            },
            {
                "id": "ct-east",
                "providerName": "AWS",
                "regionName": "US_EAST_2",
                "vpcId": "vpc-0a1b2c",
                "atlasCidrBlock": "192.168.248.0/21",
                "provisioned": true
            }
        ],
        "totalCount": 2
    })
}

pub fn peer(id: &str, status: &str) -> Value {
    let mut peer = json!({
        "id": id,
        "vpcId": "vpc-customer",
        "awsAccountId": "123456789012",
        "routeTableCidrBlock": "10.1.0.0/16",
        "containerId": "ct-east",
        "statusName": status
    });
    // Atlas assigns the connection id once the request reaches AWS.
    if status != "INITIATING" {
        peer["connectionId"] = json!("pcx-42");
    }
    peer
}

pub fn database_user(name: &str) -> Value {
    json!({
        "databaseName": "admin",
        "username": name,
        "groupId": "g1",
        "roles": [{ "databaseName": "orders", "roleName": "readWrite" }]
    })
}
