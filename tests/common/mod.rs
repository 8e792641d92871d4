#![allow(dead_code)]

use chrono::NaiveDate;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const TRANSACTION_HEADER: &str =
    "transaction_id,cust_id,tran_date,prod_subcat_code,prod_cat_code,Qty,Rate,Tax,total_amt,Store_type\n";

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

fn write(path: &Path, content: &str) {
    fs::write(path, content).unwrap();
}

/// A small data directory covering every join case
///
/// * transaction 1 and 3 share sub-category code 1 under different categories
/// * transaction 4 is a return
/// * transaction 5 has no known customer
/// * transaction 6 has no known product
/// * customer 102 points at a country code that does not exist
/// * every dimension table carries one duplicate key that must lose
pub fn fixture() -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    let transactions = dir.path().join("transactions");
    fs::create_dir(&transactions).unwrap();

    write(
        &transactions.join("2013.csv"),
        &format!(
            "{}{}{}{}",
            TRANSACTION_HEADER,
            "1,100,07-01-2013,1,1,2,100,21,221,e-Shop\n",
            "2,101,08/01/2013,4,3,1,50,5.25,55.25,TeleShop\n",
            "3,100,15-01-2013,1,2,1,80,8.4,88.4,e-Shop\n",
        ),
    );
    write(
        &transactions.join("2014.csv"),
        &format!(
            "{}{}{}{}",
            TRANSACTION_HEADER,
            "4,102,03-02-2014,1,1,-1,-100,-10.5,-110.5,e-Shop\n",
            "5,999,04-02-2014,1,1,1,100,10.5,110.5,e-Shop\n",
            "6,101,10-02-2014,9,9,1,10,1.05,11.05,Flagship store\n",
        ),
    );
    write(&transactions.join("notes.txt"), "not a transaction file\n");

    write(
        &dir.path().join("prod_cat_info.csv"),
        "prod_cat_code,prod_cat,prod_sub_cat_code,prod_subcat\n\
         1,Books,1,Fiction\n\
         1,Books,3,Comics\n\
         2,Clothing,1,Mens\n\
         3,Electronics,4,Mobiles\n\
         1,Bookz,1,Duplicate\n",
    );
    write(
        &dir.path().join("customers.csv"),
        "customer_Id,DOB,Gender,city_code\n\
         100,26-09-1981,M,1\n\
         101,11-05-1976,F,2.0\n\
         102,,F,7\n\
         100,01-01-1990,F,2\n",
    );
    write(
        &dir.path().join("country_codes.csv"),
        ",country\n\
         1,Poland\n\
         2,Germany\n\
         1,Duplicate\n",
    );

    dir
}
