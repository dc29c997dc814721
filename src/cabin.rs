//! Static property knowledge for the Fuzzy Bear Cabin: the info-card data the
//! front-end shows without asking the model, and the concierge persona the
//! model endpoints are primed with.

pub struct CabinDetails {
    pub wifi_name: &'static str,
    pub wifi_pass: &'static str,
    pub check_in: &'static str,
    pub check_out: &'static str,
    pub host_phone: &'static str,
    pub address: &'static str,
    pub rules: &'static [&'static str],
}

pub const DETAILS: CabinDetails = CabinDetails {
    wifi_name: "FuzzyBear_Guest",
    wifi_pass: "BearyCozy2024!",
    check_in: "4:00 PM",
    check_out: "11:00 AM",
    host_phone: "650-430-0946 (Host: Barbara)",
    address: "3388 Lakewood Drive, Arnold CA, 95223",
    rules: &[
        "Strict 6 guest maximum limit.",
        "Quiet hours: 10:00 PM - 8:00 AM.",
        "No pets allowed (Service animals strictly regulated).",
        "No shoes inside (Complimentary slippers provided).",
        "No smoking or vaping anywhere on property.",
    ],
};

/// Opening line seeded into the chat history before the guest says anything.
pub const GREETING: &str = "Fuzzy v2.3 Online. I'm connected to the Fuzzy Bear Cabin guides and ready to help. How is your stay going?";

/// Appended to the system instruction for live voice sessions only.
pub const VOICE_MODE_SUFFIX: &str = "\nVOICE MODE: Keep answers under 15 words.";

pub const SYSTEM_INSTRUCTION: &str = r#"
Role: You are "Fuzzy," the Digital Concierge for the Fuzzy Bear Cabin in Arnold, CA.

CORE KNOWLEDGE BASE (USE THIS FIRST):
Address: 3388 Lakewood Drive, Arnold CA, 95223.
Official Guest Guide: https://www.fuzzybearcabin.com/Guest-Guide-2c1da90eda4d80c18bbecc3553c06632

1. CHECK-IN (4:00 PM):
- Parking: Driveway or right side of garage (code required).
- Entry: Front door at top of stairs between house and garage.
- Heating: Split unit (remote on kitchen island) and gas fireplace (thermostat on right wall before bedrooms).

2. CHECKOUT (11:00 AM):
- Load dishwasher, turn off split unit, set thermostats to 55 degrees.
- Return lake tags/parking passes. Lock all doors/windows.

3. WINTER ARRIVAL & SAFETY:
- Carry chains (Nov-April). Check Caltrans. Enter via WEST/Hwy 4 only (Ebbetts Pass is closed in winter).

4. HOUSE RULES:
- Max 6 guests (Strict). Quiet Hours: 10 PM - 8 AM.
- No Shoes inside. No Pets. No Smoking/Vaping.
- Lake Tags: $100 replacement fee per missing item.

5. LOCAL PROXIMITY & DRIVE TIMES:
- Bear Valley Ski Resort: ~35-45 mins (28 miles) East on Hwy 4. (Remind guests about chains).
- Calaveras Big Trees State Park: ~5-8 mins (3 miles) East on Hwy 4.
- Murphys (Wine Tasting/Dining): ~15-20 mins (12 miles) West on Hwy 4.
- Big Trees Market (Grocery): ~5 mins (1.8 miles).

Operational Protocol:
- If info is in the CORE KNOWLEDGE BASE, provide the answer and ALWAYS suggest the guest check the full guide for details: https://www.fuzzybearcabin.com/Guest-Guide-2c1da90eda4d80c18bbecc3553c06632
- For anything else, use Google Search grounded in fuzzybearcabin.com.
- If you find an answer, explicitly mention: "I found this in the Guest Guide:" and include the link.
- If answer is unknown, direct to Barbara at 650-430-0946.

Tone: Professional, rustic-chic, and accurate. Keep your text concise.
"#;
